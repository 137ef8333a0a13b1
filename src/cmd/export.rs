//! Export command - write a dependency-ordered snapshot of a database.

use super::load_config;
use crate::compression::Compression;
use crate::dialect::SqlDialect;
use crate::schema::{split_csv, TableFilter};
use crate::sink::{FileSink, SnapshotSink, WriterSink};
use crate::snapshot::{
    snapshot_order, SnapshotOptions, SnapshotSerializer, SnapshotStats, DEFAULT_BATCH_SIZE,
};
use crate::source::DuckDbSource;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Export command arguments, as given on the command line
pub struct ExportArgs {
    pub database: Option<PathBuf>,
    pub schema: Option<String>,
    pub output: Option<PathBuf>,
    pub dialect: Option<String>,
    pub batch_size: Option<usize>,
    pub compress: Option<String>,
    pub tables: Option<String>,
    pub exclude: Option<String>,
    pub schema_only: bool,
    pub no_header: bool,
    pub no_checksum: bool,
    pub config: Option<PathBuf>,
    pub verbose: bool,
    pub progress: bool,
    pub dry_run: bool,
    pub json: bool,
}

/// JSON output for the export command
#[derive(Serialize)]
struct ExportJsonOutput {
    database: String,
    output_file: String,
    elapsed_secs: f64,
    #[serde(flatten)]
    stats: SnapshotStats,
}

pub fn run(args: ExportArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;

    let database = match args.database.or(config.database) {
        Some(db) => db,
        None => bail!("no database given: pass --database or set `database` in the config file"),
    };
    if !database.exists() {
        bail!("database file does not exist: {}", database.display());
    }

    let schema = args
        .schema
        .or(config.schema)
        .unwrap_or_else(|| "main".to_string());

    let dialect: SqlDialect = match args.dialect {
        Some(d) => d.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        None => config.dialect.unwrap_or_default(),
    };

    let include = match args.tables.as_deref() {
        Some(t) => split_csv(Some(t)),
        None => config.tables,
    };
    let exclude = match args.exclude.as_deref() {
        Some(e) => split_csv(Some(e)),
        None => config.exclude,
    };
    let filter = TableFilter::new(&include, &exclude)?;

    let generated_at = Utc::now();
    let options = SnapshotOptions::default()
        .with_dialect(dialect)
        .with_batch_size(
            args.batch_size
                .or(config.batch_size)
                .unwrap_or(DEFAULT_BATCH_SIZE),
        )
        .with_data(!(args.schema_only || config.schema_only))
        .with_header(!args.no_header && config.header.unwrap_or(true))
        .with_checksum(!args.no_checksum && config.checksum.unwrap_or(true))
        .with_generated_at(generated_at)
        .with_filter(filter);

    let source = DuckDbSource::open(&database)?;

    eprintln!(
        "Analyzing schema '{}' in {} [dialect: {}]",
        schema,
        database.display(),
        dialect
    );

    let order = snapshot_order(&schema, &source, &options.filter)?;
    if order.is_empty() {
        eprintln!(
            "No tables found in schema '{}'; the snapshot will hold only the preamble.",
            schema
        );
    }

    if args.dry_run {
        eprintln!("\nExport order ({} tables):", order.len());
        for (i, table) in order.iter().enumerate() {
            eprintln!("  {}. {}", i + 1, table);
        }
        return Ok(());
    }

    let compress: Option<Compression> = match args.compress {
        Some(c) => Some(c.parse().map_err(|e: String| anyhow::anyhow!(e))?),
        None => config.compress,
    };
    let output = args.output.or(config.output);

    if args.json && output.is_none() {
        bail!("--json needs a file output (-o) since the snapshot itself goes to stdout");
    }

    let progress_bar = if args.progress {
        let pb = ProgressBar::new(order.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} tables {msg}",
            )
            .unwrap()
            .progress_chars("█▓▒░  ")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let mut serializer = SnapshotSerializer::new(options);
    if let Some(ref pb) = progress_bar {
        let pb = pb.clone();
        serializer = serializer.with_progress(move |p| {
            pb.set_position(p.index as u64);
            pb.set_message(p.table.to_string());
        });
    } else if args.verbose {
        serializer = serializer.with_progress(|p| {
            eprintln!("  [{}/{}] {} ({} rows)", p.index, p.total, p.table, p.rows);
        });
    }

    let start_time = Instant::now();

    let (stats, written_to) = match output {
        Some(ref path) => {
            let target = resolve_output_path(path, &schema, compress, generated_at);
            let mut sink = match compress {
                Some(c) => FileSink::with_compression(&target, c),
                None => FileSink::create(&target),
            }
            .with_context(|| format!("Failed to create output file: {}", target.display()))?;
            let stats = serialize(&serializer, &schema, &order, &source, &mut sink)?;
            (stats, Some(target))
        }
        None => {
            if compress.is_some_and(|c| c != Compression::None) {
                bail!("--compress needs a file output (-o)");
            }
            let mut sink = WriterSink::new(std::io::stdout().lock());
            let stats = serialize(&serializer, &schema, &order, &source, &mut sink)?;
            (stats, None)
        }
    };

    if let Some(pb) = progress_bar {
        pb.finish_with_message("done");
    }

    let elapsed = start_time.elapsed();

    if args.json {
        let out = ExportJsonOutput {
            database: database.display().to_string(),
            output_file: written_to
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            elapsed_secs: elapsed.as_secs_f64(),
            stats,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if let Some(ref target) = written_to {
        eprintln!("Snapshot written to: {}", target.display());
    }
    eprintln!(
        "✓ Exported {} tables, {} rows in {} INSERT statements ({:.2} MB) in {:.3?}",
        stats.tables.len(),
        stats.total_rows,
        stats.insert_statements,
        stats.bytes_written as f64 / (1024.0 * 1024.0),
        elapsed
    );
    if let Some(ref checksum) = stats.checksum {
        eprintln!("  sha256: {}", checksum);
    }

    Ok(())
}

fn serialize(
    serializer: &SnapshotSerializer,
    schema: &str,
    order: &[String],
    source: &DuckDbSource,
    sink: &mut dyn SnapshotSink,
) -> Result<SnapshotStats> {
    serializer
        .serialize(schema, order, source, source, sink)
        .context("Snapshot export failed; no complete snapshot was written")
}

/// Resolve the output file. Existing directories (or paths ending in a
/// separator) receive `<schema>-snapshot-YYYYMMDD-HHMMSS.sql[.ext]`.
pub(crate) fn resolve_output_path(
    output: &Path,
    schema: &str,
    compress: Option<Compression>,
    at: DateTime<Utc>,
) -> PathBuf {
    let as_dir = output.is_dir()
        || output
            .to_str()
            .is_some_and(|s| s.ends_with('/') || s.ends_with(std::path::MAIN_SEPARATOR));
    if !as_dir {
        return output.to_path_buf();
    }

    let mut name = format!("{}-snapshot-{}.sql", schema, at.format("%Y%m%d-%H%M%S"));
    if let Some(ext) = compress.and_then(|c| c.extension()) {
        name.push('.');
        name.push_str(ext);
    }
    output.join(name)
}
