//! Catalog and row sources.
//!
//! `SchemaSource` (see [`crate::schema`]) answers metadata questions;
//! `RowSource` pulls table data. Both are implemented by:
//! - [`MemorySource`]: an in-memory catalog, mostly for tests and embedding
//! - [`DuckDbSource`]: a live DuckDB database

mod duckdb;
mod memory;

pub use self::duckdb::DuckDbSource;
pub use self::memory::{MemorySource, MemoryTable};

use crate::value::Row;

/// Read access to table data
pub trait RowSource {
    /// Every row of `table`, each an ordered column → value mapping
    fn all_rows(&self, schema: &str, table: &str) -> anyhow::Result<Vec<Row>>;
}
