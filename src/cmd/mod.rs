mod export;
mod order;
mod verify;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sql-snapshot")]
#[command(author = "Helge Sverre <helge.sverre@gmail.com>")]
#[command(version)]
#[command(about = "Export a database as a dependency-ordered, re-executable SQL snapshot", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export schema and data as one SQL script, tables in foreign key order
    Export {
        /// DuckDB database file to snapshot
        #[arg(long)]
        database: Option<PathBuf>,

        /// Schema to snapshot (default: main)
        #[arg(short, long)]
        schema: Option<String>,

        /// Output file or directory (default: stdout). Directories receive a
        /// timestamped file. Supports .gz, .bz2, .xz, .zst compression by extension
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output dialect: mysql, postgres, or sqlite (default: mysql)
        #[arg(short, long)]
        dialect: Option<String>,

        /// Rows per INSERT statement (default: 100)
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Compression: none, gzip, bzip2, xz, zstd (default: from output extension)
        #[arg(long)]
        compress: Option<String>,

        /// Only export specific tables (comma-separated glob patterns)
        #[arg(short, long)]
        tables: Option<String>,

        /// Exclude specific tables (comma-separated glob patterns)
        #[arg(short, long)]
        exclude: Option<String>,

        /// Only export DROP/CREATE statements, no row data
        #[arg(long)]
        schema_only: bool,

        /// Skip the header comment block
        #[arg(long)]
        no_header: bool,

        /// Skip the checksum footer
        #[arg(long)]
        no_checksum: bool,

        /// YAML config file (command-line flags take precedence)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Show progress during export
        #[arg(short, long)]
        progress: bool,

        /// Print the table order without exporting (dry run)
        #[arg(long)]
        dry_run: bool,

        /// Print export statistics as JSON (requires a file output)
        #[arg(long)]
        json: bool,
    },

    /// Print tables in dependency order (referenced tables first)
    Order {
        /// DuckDB database file to inspect
        #[arg(long)]
        database: Option<PathBuf>,

        /// Schema to inspect (default: main)
        #[arg(short, long)]
        schema: Option<String>,

        /// Only include specific tables (comma-separated glob patterns)
        #[arg(short, long)]
        tables: Option<String>,

        /// Exclude specific tables (comma-separated glob patterns)
        #[arg(short, long)]
        exclude: Option<String>,

        /// YAML config file (command-line flags take precedence)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only report whether an order exists
        #[arg(long)]
        check: bool,

        /// Reverse the order (dependents first, e.g. for deletes)
        #[arg(long)]
        reverse: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that a snapshot file is complete and its checksum matches
    Verify {
        /// Snapshot file (supports .gz, .bz2, .xz, .zst compression)
        file: PathBuf,

        /// Fail on snapshots written without a checksum
        #[arg(long)]
        strict: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Export {
            database,
            schema,
            output,
            dialect,
            batch_size,
            compress,
            tables,
            exclude,
            schema_only,
            no_header,
            no_checksum,
            config,
            verbose,
            progress,
            dry_run,
            json,
        } => export::run(export::ExportArgs {
            database,
            schema,
            output,
            dialect,
            batch_size,
            compress,
            tables,
            exclude,
            schema_only,
            no_header,
            no_checksum,
            config,
            verbose,
            progress,
            dry_run,
            json,
        }),
        Commands::Order {
            database,
            schema,
            tables,
            exclude,
            config,
            check,
            reverse,
            json,
        } => order::run(
            database, schema, tables, exclude, config, check, reverse, json,
        ),
        Commands::Verify { file, strict, json } => verify::run(file, strict, json),
        Commands::Completions { shell } => {
            generate(
                shell,
                &mut Cli::command(),
                "sql-snapshot",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}

/// Load the YAML config if one was given
pub(crate) fn load_config(path: Option<&PathBuf>) -> anyhow::Result<crate::config::SnapshotConfig> {
    use anyhow::Context;

    match path {
        Some(p) => crate::config::SnapshotConfig::load(p)
            .with_context(|| format!("Failed to load config: {}", p.display())),
        None => Ok(Default::default()),
    }
}
