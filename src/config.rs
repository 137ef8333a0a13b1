//! YAML configuration for the export command.
//!
//! Every field is optional; command-line flags take precedence.
//!
//! ```yaml
//! database: data/app.duckdb
//! schema: main
//! dialect: mysql
//! batch_size: 500
//! output: backups/
//! compress: zstd
//! exclude: [sessions, "cache_*"]
//! ```

use crate::compression::Compression;
use crate::dialect::SqlDialect;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Complete YAML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SnapshotConfig {
    /// DuckDB database file to snapshot
    pub database: Option<PathBuf>,
    /// Schema to snapshot
    pub schema: Option<String>,
    /// Output dialect
    pub dialect: Option<SqlDialect>,
    /// Rows per INSERT statement
    pub batch_size: Option<usize>,
    /// Output file, or directory for a timestamped file
    pub output: Option<PathBuf>,
    /// Output compression
    pub compress: Option<Compression>,
    /// Table include patterns
    pub tables: Vec<String>,
    /// Table exclude patterns
    pub exclude: Vec<String>,
    /// Skip row data
    pub schema_only: bool,
    /// Write the header comment block
    pub header: Option<bool>,
    /// Write the checksum footer
    pub checksum: Option<bool>,
}

impl SnapshotConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: SnapshotConfig = serde_yaml_ng::from_str(content)?;
        Ok(config)
    }
}
