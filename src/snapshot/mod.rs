//! Snapshot serialization.
//!
//! Turns a dependency order plus per-table DDL and rows into one re-executable
//! SQL script:
//!
//! ```text
//! -- header comments
//! CREATE SCHEMA IF NOT EXISTS ...;      schema preamble
//! SET FOREIGN_KEY_CHECKS = 0;           integrity off
//! DROP TABLE IF EXISTS ...;             per table, dependencies first
//! CREATE TABLE ...;
//! INSERT INTO ... VALUES ...;           batched, only when rows exist
//! SET FOREIGN_KEY_CHECKS = 1;           integrity on
//! -- sha256: <hex>                      checksum of everything above
//! ```

mod batch;

pub use batch::{insert_statement, insert_statements, DEFAULT_BATCH_SIZE};

use crate::dialect::SqlDialect;
use crate::error::SnapshotError;
use crate::schema::{DependencyGraph, SchemaSource, TableFilter};
use crate::sink::SnapshotSink;
use crate::source::RowSource;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Version written into the header marker line
pub const FORMAT_VERSION: u32 = 1;
/// First line of every snapshot written with a header
pub const HEADER_MARKER: &str = "-- sql-snapshot format";
/// Prefix of the checksum footer line
pub const CHECKSUM_PREFIX: &str = "-- sha256: ";

/// Snapshot options
#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    pub dialect: SqlDialect,
    /// Rows per INSERT statement (must be at least 1)
    pub batch_size: usize,
    /// Emit INSERT statements (false produces a schema-only snapshot)
    pub include_data: bool,
    /// Emit the header comment block
    pub header: bool,
    /// Emit the checksum footer
    pub checksum: bool,
    /// Timestamp recorded in the header
    pub generated_at: Option<DateTime<Utc>>,
    /// Tables to include/exclude
    pub filter: TableFilter,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            include_data: true,
            header: true,
            checksum: true,
            generated_at: None,
            filter: TableFilter::default(),
        }
    }
}

impl SnapshotOptions {
    pub fn with_dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_data(mut self, include_data: bool) -> Self {
        self.include_data = include_data;
        self
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn with_checksum(mut self, checksum: bool) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn with_generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }

    pub fn with_filter(mut self, filter: TableFilter) -> Self {
        self.filter = filter;
        self
    }

    fn validate(&self) -> Result<(), SnapshotError> {
        if self.batch_size == 0 {
            return Err(SnapshotError::InvalidOptions(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-table statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableStats {
    pub name: String,
    pub rows: u64,
    pub insert_statements: u64,
}

/// Statistics from a completed snapshot
#[derive(Debug, Clone, Default, Serialize)]
pub struct SnapshotStats {
    pub schema: String,
    pub dialect: String,
    pub tables: Vec<TableStats>,
    pub total_rows: u64,
    pub insert_statements: u64,
    pub bytes_written: u64,
    /// Hex SHA-256 recorded in the footer, if enabled
    pub checksum: Option<String>,
}

/// Progress report after each table
#[derive(Debug, Clone, Copy)]
pub struct TableProgress<'a> {
    /// 1-based position of the table in the order
    pub index: usize,
    pub total: usize,
    pub table: &'a str,
    pub rows: u64,
}

/// Writes chunks to the sink while tracking size and checksum
struct Emitter<'s> {
    sink: &'s mut dyn SnapshotSink,
    hasher: Option<Sha256>,
    bytes: u64,
}

impl<'s> Emitter<'s> {
    fn line(&mut self, text: &str, table: Option<&str>) -> Result<(), SnapshotError> {
        self.chunk(text, table)?;
        self.chunk("\n", table)
    }

    fn chunk(&mut self, text: &str, table: Option<&str>) -> Result<(), SnapshotError> {
        self.sink
            .write(text)
            .map_err(|e| SnapshotError::sink(table, e))?;
        if let Some(hasher) = self.hasher.as_mut() {
            hasher.update(text.as_bytes());
        }
        self.bytes += text.len() as u64;
        Ok(())
    }
}

/// Serializer for ordered tables
pub struct SnapshotSerializer {
    options: SnapshotOptions,
    progress_fn: Option<Box<dyn Fn(TableProgress<'_>)>>,
}

impl SnapshotSerializer {
    pub fn new(options: SnapshotOptions) -> Self {
        Self {
            options,
            progress_fn: None,
        }
    }

    pub fn with_progress<F: Fn(TableProgress<'_>) + 'static>(mut self, f: F) -> Self {
        self.progress_fn = Some(Box::new(f));
        self
    }

    pub fn options(&self) -> &SnapshotOptions {
        &self.options
    }

    /// Serialize `order` into `sink`, then finish the sink.
    ///
    /// Any failure aborts the whole snapshot; the sink is only finished after
    /// the final statement has been written.
    pub fn serialize(
        &self,
        schema: &str,
        order: &[String],
        schema_source: &dyn SchemaSource,
        row_source: &dyn RowSource,
        sink: &mut dyn SnapshotSink,
    ) -> Result<SnapshotStats, SnapshotError> {
        self.options.validate()?;
        let dialect = self.options.dialect;

        let mut out = Emitter {
            sink,
            hasher: self.options.checksum.then(Sha256::new),
            bytes: 0,
        };
        let mut stats = SnapshotStats {
            schema: schema.to_string(),
            dialect: dialect.to_string(),
            ..Default::default()
        };

        if self.options.header {
            self.write_header(&mut out, schema, order.len())?;
        }
        for stmt in dialect.schema_preamble(schema) {
            out.line(&stmt, None)?;
        }
        out.line(dialect.disable_integrity(), None)?;
        out.line("", None)?;

        for (i, table) in order.iter().enumerate() {
            let table_stats = self.write_table(&mut out, schema, table, schema_source, row_source)?;
            if let Some(ref cb) = self.progress_fn {
                cb(TableProgress {
                    index: i + 1,
                    total: order.len(),
                    table: table.as_str(),
                    rows: table_stats.rows,
                });
            }
            stats.total_rows += table_stats.rows;
            stats.insert_statements += table_stats.insert_statements;
            stats.tables.push(table_stats);
        }

        out.line(dialect.enable_integrity(), None)?;

        if let Some(hasher) = out.hasher.take() {
            let digest = hex::encode(hasher.finalize());
            out.line(&format!("{}{}", CHECKSUM_PREFIX, digest), None)?;
            stats.checksum = Some(digest);
        }

        out.sink
            .finish()
            .map_err(|e| SnapshotError::sink(None, e))?;
        stats.bytes_written = out.bytes;
        Ok(stats)
    }

    fn write_header(
        &self,
        out: &mut Emitter<'_>,
        schema: &str,
        table_count: usize,
    ) -> Result<(), SnapshotError> {
        out.line(&format!("{} {}", HEADER_MARKER, FORMAT_VERSION), None)?;
        out.line(&format!("-- Schema: {}", schema), None)?;
        out.line(&format!("-- Dialect: {}", self.options.dialect), None)?;
        out.line(&format!("-- Tables: {}", table_count), None)?;
        if let Some(at) = self.options.generated_at {
            out.line(
                &format!("-- Generated: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
                None,
            )?;
        }
        out.line("", None)
    }

    fn write_table(
        &self,
        out: &mut Emitter<'_>,
        schema: &str,
        table: &str,
        schema_source: &dyn SchemaSource,
        row_source: &dyn RowSource,
    ) -> Result<TableStats, SnapshotError> {
        let dialect = self.options.dialect;
        let ddl = schema_source
            .create_statement(schema, table)
            .map_err(|e| SnapshotError::DdlFetch {
                table: table.to_string(),
                source: e,
            })?;
        let rows = if self.options.include_data {
            row_source
                .all_rows(schema, table)
                .map_err(|e| SnapshotError::RowFetch {
                    table: table.to_string(),
                    source: e,
                })?
        } else {
            Vec::new()
        };

        let mut stats = TableStats {
            name: table.to_string(),
            rows: rows.len() as u64,
            insert_statements: 0,
        };

        let ctx = Some(table);
        out.line(&format!("-- Table: {}", table), ctx)?;
        out.line(&dialect.drop_table(table), ctx)?;
        let ddl = ddl.trim_end();
        if ddl.ends_with(';') {
            out.line(ddl, ctx)?;
        } else {
            out.chunk(ddl, ctx)?;
            out.line(";", ctx)?;
        }

        for stmt in insert_statements(dialect, table, &rows, self.options.batch_size) {
            out.line(&stmt, ctx)?;
            stats.insert_statements += 1;
        }
        out.line("", ctx)?;

        Ok(stats)
    }
}

/// Discover, order and serialize `schema` into `sink`.
///
/// The streaming entry point: rows are pulled one table at a time and each
/// INSERT batch is written as soon as it is rendered.
pub fn export_snapshot(
    schema: &str,
    schema_source: &dyn SchemaSource,
    row_source: &dyn RowSource,
    sink: &mut dyn SnapshotSink,
    options: &SnapshotOptions,
) -> Result<SnapshotStats, SnapshotError> {
    let order = snapshot_order(schema, schema_source, &options.filter)?;
    SnapshotSerializer::new(options.clone()).serialize(
        schema,
        &order,
        schema_source,
        row_source,
        sink,
    )
}

/// Build a complete snapshot of `schema` in memory with default options
pub fn build_snapshot(
    schema: &str,
    schema_source: &dyn SchemaSource,
    row_source: &dyn RowSource,
) -> Result<String, SnapshotError> {
    let mut text = String::new();
    export_snapshot(
        schema,
        schema_source,
        row_source,
        &mut text,
        &SnapshotOptions::default(),
    )?;
    Ok(text)
}

/// Discover the dependency graph of `schema` and return its table order
pub fn snapshot_order(
    schema: &str,
    schema_source: &dyn SchemaSource,
    filter: &TableFilter,
) -> Result<Vec<String>, SnapshotError> {
    let mut graph = DependencyGraph::discover(schema_source, schema)?;
    graph.retain(filter);
    graph.topo_sort()
}
