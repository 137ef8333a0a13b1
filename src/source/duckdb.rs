//! DuckDB-backed catalog and row source.
//!
//! Reads metadata from DuckDB's catalog functions:
//! - `duckdb_tables()` for table names and stored CREATE statements
//! - `duckdb_constraints()` for foreign key targets

use super::RowSource;
use crate::schema::{ForeignKeyRef, SchemaSource};
use crate::value::{Row, Value};
use anyhow::{bail, Context, Result};
use duckdb::types::{TimeUnit, ValueRef};
use duckdb::Connection;
use std::path::Path;

/// Days from 0001-01-01 to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A DuckDB database opened for snapshotting
pub struct DuckDbSource {
    conn: Connection,
}

impl DuckDbSource {
    /// Open a database file
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open DuckDB database: {}", path.display()))?;
        Ok(Self { conn })
    }

    /// Open an empty in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to create in-memory DuckDB database")?;
        Ok(Self { conn })
    }

    /// Wrap an existing connection
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Execute one or more statements (used to seed databases)
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .with_context(|| format!("Failed to execute: {}", sql))
    }

    /// Get the underlying DuckDB connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl SchemaSource for DuckDbSource {
    fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name FROM duckdb_tables() \
             WHERE database_name = current_database() AND schema_name = ? \
             AND NOT internal AND NOT temporary \
             ORDER BY table_name",
        )?;
        let tables = stmt
            .query_map([schema], |row| row.get::<_, String>(0))?
            .collect::<duckdb::Result<Vec<_>>>()
            .context("Failed to list tables")?;
        Ok(tables)
    }

    fn list_foreign_keys(&self, schema: &str) -> Result<Vec<ForeignKeyRef>> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name, referenced_table FROM duckdb_constraints() \
             WHERE database_name = current_database() AND schema_name = ? \
             AND constraint_type = 'FOREIGN KEY' AND referenced_table IS NOT NULL \
             ORDER BY table_name, constraint_index",
        )?;
        let keys = stmt
            .query_map([schema], |row| {
                Ok(ForeignKeyRef::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                ))
            })?
            .collect::<duckdb::Result<Vec<_>>>()
            .context("Failed to list foreign keys")?;
        Ok(keys)
    }

    fn create_statement(&self, schema: &str, table: &str) -> Result<String> {
        let mut stmt = self.conn.prepare(
            "SELECT sql FROM duckdb_tables() \
             WHERE database_name = current_database() AND schema_name = ? AND table_name = ?",
        )?;
        let mut rows = stmt.query([schema, table])?;
        match rows.next()? {
            Some(row) => Ok(row.get::<_, String>(0)?),
            None => anyhow::bail!("table not found: {}.{}", schema, table),
        }
    }
}

impl RowSource for DuckDbSource {
    fn all_rows(&self, schema: &str, table: &str) -> Result<Vec<Row>> {
        let sql = format!(
            "SELECT * FROM {}.{}",
            quote_ident(schema),
            quote_ident(table)
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .with_context(|| format!("Failed to prepare query: {}", sql))?;
        let mut rows_result = stmt
            .query([])
            .with_context(|| format!("Failed to execute query: {}", sql))?;

        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::new();

        while let Some(row) = rows_result.next()? {
            if columns.is_empty() {
                let stmt_ref = row.as_ref();
                columns = (0..stmt_ref.column_count())
                    .map(|i| {
                        stmt_ref
                            .column_name(i)
                            .map(|s| s.to_string())
                            .unwrap_or_else(|_| format!("col{}", i))
                    })
                    .collect();
            }

            let mut out = Row::new();
            for (i, name) in columns.iter().enumerate() {
                let value = convert_value(row.get_ref(i)?).with_context(|| {
                    format!("Cannot encode column `{}` of table `{}`", name, table)
                })?;
                out.push(name.as_str(), value);
            }
            rows.push(out);
        }

        Ok(rows)
    }
}

/// Map a DuckDB cell onto the snapshot value model.
///
/// Types without a literal that restores the same value fail the row fetch.
fn convert_value(value: ValueRef<'_>) -> Result<Value> {
    let converted = match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(n) => Value::Int(n as i64),
        ValueRef::SmallInt(n) => Value::Int(n as i64),
        ValueRef::Int(n) => Value::Int(n as i64),
        ValueRef::BigInt(n) => Value::Int(n),
        ValueRef::HugeInt(n) => Value::Decimal(n.to_string()),
        ValueRef::UHugeInt(n) => Value::Decimal(n.to_string()),
        ValueRef::UTinyInt(n) => Value::Int(n as i64),
        ValueRef::USmallInt(n) => Value::Int(n as i64),
        ValueRef::UInt(n) => Value::Int(n as i64),
        ValueRef::UBigInt(n) => Value::from(n),
        // REAL is written from its f32 text, not a widened f64
        ValueRef::Float(f) if f.is_finite() => Value::Decimal(f.to_string()),
        ValueRef::Float(_) => Value::Null,
        ValueRef::Double(f) => Value::Float(f),
        ValueRef::Decimal(d) => Value::Decimal(d.to_string()),
        ValueRef::Text(s) => Value::Text(String::from_utf8_lossy(s).into_owned()),
        ValueRef::Blob(b) => match std::str::from_utf8(b) {
            Ok(text) => Value::Text(text.to_string()),
            Err(_) => bail!("BLOB value is not valid UTF-8 and has no text literal"),
        },
        ValueRef::Enum(..) => {
            let label = value.as_str().context("Failed to resolve ENUM label")?;
            Value::Text(label.to_string())
        }
        ValueRef::Timestamp(unit, ts) => {
            // TIMESTAMPTZ is stored as UTC, so both map to UTC wall-clock time
            let micros = to_micros(unit, ts);
            match chrono::DateTime::from_timestamp_micros(micros) {
                Some(dt) => Value::Timestamp(dt.naive_utc()),
                None => bail!("TIMESTAMP value {} ({:?}) is out of range", ts, unit),
            }
        }
        ValueRef::Date32(days) => {
            match UNIX_EPOCH_DAYS_FROM_CE
                .checked_add(days)
                .and_then(chrono::NaiveDate::from_num_days_from_ce_opt)
            {
                Some(date) => Value::from_date(date),
                None => bail!("DATE value {} days from epoch is out of range", days),
            }
        }
        ValueRef::Time64(unit, t) => {
            let micros = to_micros(unit, t);
            let secs = u32::try_from(micros / 1_000_000).ok();
            let nanos = u32::try_from((micros % 1_000_000) * 1000).ok();
            let time = secs
                .zip(nanos)
                .and_then(|(s, n)| chrono::NaiveTime::from_num_seconds_from_midnight_opt(s, n));
            match time {
                Some(time) => Value::Text(time.format("%H:%M:%S").to_string()),
                None => bail!("TIME value {} ({:?}) is out of range", t, unit),
            }
        }
        ValueRef::Interval {
            months,
            days,
            nanos,
        } => Value::Text(interval_literal(months, days, nanos)),
        other => bail!("no SQL literal encoding for {} values", other.data_type()),
    };
    Ok(converted)
}

/// Interval text accepted by DuckDB and PostgreSQL, e.g. `1 months 2 days 03:00:00.5`
fn interval_literal(months: i32, days: i32, nanos: i64) -> String {
    let mut parts = Vec::new();
    if months != 0 {
        parts.push(format!("{} months", months));
    }
    if days != 0 {
        parts.push(format!("{} days", days));
    }

    let micros = nanos / 1_000;
    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        let abs = micros.unsigned_abs();
        let secs = abs / 1_000_000;
        let frac = abs % 1_000_000;
        let mut time = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        );
        if frac != 0 {
            let digits = format!("{:06}", frac);
            time.push('.');
            time.push_str(digits.trim_end_matches('0'));
        }
        parts.push(time);
    }

    parts.join(" ")
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
