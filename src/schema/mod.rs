//! Schema discovery and dependency ordering.
//!
//! This module provides:
//! - The `SchemaSource` collaborator used to read catalog metadata
//! - Foreign key references between tables
//! - Include/exclude table filtering
//! - Dependency graph construction with topological sorting

mod graph;

pub use graph::*;

use glob::Pattern;

/// A foreign key relation: `table` references `referenced_table`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignKeyRef {
    /// Table holding the foreign key
    pub table: String,
    /// Table the foreign key points at
    pub referenced_table: String,
}

impl ForeignKeyRef {
    pub fn new(table: impl Into<String>, referenced_table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            referenced_table: referenced_table.into(),
        }
    }

    /// Whether the key points back at its own table
    pub fn is_self_reference(&self) -> bool {
        self.table == self.referenced_table
    }
}

/// Read access to a database catalog.
///
/// Implementations should not retry; failures are reported to the caller as
/// schema discovery failures.
pub trait SchemaSource {
    /// All table names in `schema`, in a stable order
    fn list_tables(&self, schema: &str) -> anyhow::Result<Vec<String>>;

    /// Every `(table, referenced_table)` pair in `schema`. Keys whose target
    /// table is unknown or outside the schema must be omitted.
    fn list_foreign_keys(&self, schema: &str) -> anyhow::Result<Vec<ForeignKeyRef>>;

    /// The CREATE TABLE statement for `table`, as stored by the engine
    fn create_statement(&self, schema: &str, table: &str) -> anyhow::Result<String>;
}

/// Include/exclude table filter built from glob patterns
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl TableFilter {
    /// Build a filter. An empty include list accepts every table not excluded.
    pub fn new(include: &[String], exclude: &[String]) -> anyhow::Result<Self> {
        let compile = |patterns: &[String]| -> anyhow::Result<Vec<Pattern>> {
            patterns
                .iter()
                .map(|p| {
                    Pattern::new(p.trim())
                        .map_err(|e| anyhow::anyhow!("invalid table pattern '{}': {}", p, e))
                })
                .collect()
        };
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// Parse comma-separated pattern lists, as given on the command line
    pub fn from_csv(include: Option<&str>, exclude: Option<&str>) -> anyhow::Result<Self> {
        Self::new(&split_csv(include), &split_csv(exclude))
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn matches(&self, table: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|p| p.matches(table));
        included && !self.exclude.iter().any(|p| p.matches(table))
    }
}

/// Split a comma-separated list, dropping empty entries
pub fn split_csv(list: Option<&str>) -> Vec<String> {
    list.map(|s| {
        s.split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_include_and_exclude() {
        let filter = TableFilter::from_csv(Some("user*, orders"), Some("user_sessions")).unwrap();
        assert!(filter.matches("users"));
        assert!(filter.matches("orders"));
        assert!(!filter.matches("user_sessions"));
        assert!(!filter.matches("products"));
    }

    #[test]
    fn test_empty_filter_accepts_all() {
        let filter = TableFilter::from_csv(None, Some(" , ")).unwrap();
        assert!(filter.is_empty());
        assert!(filter.matches("anything"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(TableFilter::from_csv(Some("[abc"), None).is_err());
    }
}
