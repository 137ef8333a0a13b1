//! Error types for snapshot export.
//!
//! Every failure is fatal to the export run. Errors carry enough context
//! (schema, table, cycle path) for the caller to identify the offending table.

use std::fmt;
use std::io;

/// Coarse classification of a [`SnapshotError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A table's dependency chain loops back on a table still being visited
    CyclicDependency,
    /// Listing tables, foreign keys or DDL failed
    SchemaDiscoveryFailure,
    /// Pulling rows for a table failed
    RowFetchFailure,
    /// Persisting produced text failed
    SinkWriteFailure,
    /// Export options are unusable
    InvalidOptions,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::CyclicDependency => write!(f, "cyclic dependency"),
            ErrorKind::SchemaDiscoveryFailure => write!(f, "schema discovery failure"),
            ErrorKind::RowFetchFailure => write!(f, "row fetch failure"),
            ErrorKind::SinkWriteFailure => write!(f, "sink write failure"),
            ErrorKind::InvalidOptions => write!(f, "invalid options"),
        }
    }
}

/// Errors raised while building, ordering or serializing a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Circular foreign key dependency. `table` is the table found in progress;
    /// `cycle` is the path from it back to itself.
    #[error("circular dependency detected at table `{table}` ({})", .cycle.join(" -> "))]
    CyclicDependency { table: String, cycle: Vec<String> },

    /// Table or foreign key discovery failed
    #[error("schema discovery failed for `{schema}` while {operation}")]
    SchemaDiscovery {
        schema: String,
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// CREATE statement could not be read for a table
    #[error("failed to read CREATE statement for table `{table}`")]
    DdlFetch {
        table: String,
        #[source]
        source: anyhow::Error,
    },

    /// Row retrieval failed for a table
    #[error("failed to fetch rows for table `{table}`")]
    RowFetch {
        table: String,
        #[source]
        source: anyhow::Error,
    },

    /// Writing to the sink failed
    #[error("failed to write snapshot{}", .table.as_ref().map(|t| format!(" (table `{t}`)")).unwrap_or_default())]
    SinkWrite {
        table: Option<String>,
        #[source]
        source: io::Error,
    },

    /// Options rejected before any output was produced
    #[error("invalid snapshot options: {0}")]
    InvalidOptions(String),
}

impl SnapshotError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SnapshotError::CyclicDependency { .. } => ErrorKind::CyclicDependency,
            SnapshotError::SchemaDiscovery { .. } | SnapshotError::DdlFetch { .. } => {
                ErrorKind::SchemaDiscoveryFailure
            }
            SnapshotError::RowFetch { .. } => ErrorKind::RowFetchFailure,
            SnapshotError::SinkWrite { .. } => ErrorKind::SinkWriteFailure,
            SnapshotError::InvalidOptions(_) => ErrorKind::InvalidOptions,
        }
    }

    /// The table this error is attributed to, if any
    pub fn table(&self) -> Option<&str> {
        match self {
            SnapshotError::CyclicDependency { table, .. }
            | SnapshotError::DdlFetch { table, .. }
            | SnapshotError::RowFetch { table, .. } => Some(table),
            SnapshotError::SinkWrite { table, .. } => table.as_deref(),
            SnapshotError::SchemaDiscovery { .. } | SnapshotError::InvalidOptions(_) => None,
        }
    }

    pub(crate) fn sink(table: Option<&str>, source: io::Error) -> Self {
        SnapshotError::SinkWrite {
            table: table.map(str::to_string),
            source,
        }
    }
}
