use super::RowSource;
use crate::schema::{ForeignKeyRef, SchemaSource};
use crate::value::Row;
use anyhow::anyhow;

/// A table held by [`MemorySource`]
#[derive(Debug, Clone)]
pub struct MemoryTable {
    pub name: String,
    pub create_statement: String,
    /// Referenced table names, one entry per foreign key
    pub references: Vec<String>,
    pub rows: Vec<Row>,
}

/// In-memory catalog for a single schema.
///
/// Tables are listed in insertion order. Foreign keys naming a table that
/// was never added are omitted from `list_foreign_keys`, matching how a
/// catalog query filters out unresolved targets.
#[derive(Debug, Clone)]
pub struct MemorySource {
    schema: String,
    tables: Vec<MemoryTable>,
}

impl MemorySource {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            tables: Vec::new(),
        }
    }

    /// Add a table with a generated placeholder CREATE statement
    pub fn table(self, name: &str, references: &[&str]) -> Self {
        let ddl = format!("CREATE TABLE {} (id INT PRIMARY KEY)", name);
        self.table_with_ddl(name, &ddl, references)
    }

    /// Add a table with an explicit CREATE statement
    pub fn table_with_ddl(mut self, name: &str, ddl: &str, references: &[&str]) -> Self {
        self.tables.push(MemoryTable {
            name: name.to_string(),
            create_statement: ddl.to_string(),
            references: references.iter().map(|r| r.to_string()).collect(),
            rows: Vec::new(),
        });
        self
    }

    /// Replace the rows of an existing table
    pub fn rows(mut self, name: &str, rows: Vec<Row>) -> Self {
        if let Some(table) = self.tables.iter_mut().find(|t| t.name == name) {
            table.rows = rows;
        }
        self
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    fn check_schema(&self, schema: &str) -> anyhow::Result<()> {
        if schema == self.schema {
            Ok(())
        } else {
            Err(anyhow!("unknown schema: {}", schema))
        }
    }
}

impl SchemaSource for MemorySource {
    fn list_tables(&self, schema: &str) -> anyhow::Result<Vec<String>> {
        self.check_schema(schema)?;
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    fn list_foreign_keys(&self, schema: &str) -> anyhow::Result<Vec<ForeignKeyRef>> {
        self.check_schema(schema)?;
        Ok(self
            .tables
            .iter()
            .flat_map(|t| {
                t.references
                    .iter()
                    .filter(move |r| self.get(r).is_some())
                    .map(move |r| ForeignKeyRef::new(t.name.as_str(), r.as_str()))
            })
            .collect())
    }

    fn create_statement(&self, schema: &str, table: &str) -> anyhow::Result<String> {
        self.check_schema(schema)?;
        self.get(table)
            .map(|t| t.create_statement.clone())
            .ok_or_else(|| anyhow!("unknown table: {}", table))
    }
}

impl RowSource for MemorySource {
    fn all_rows(&self, schema: &str, table: &str) -> anyhow::Result<Vec<Row>> {
        self.check_schema(schema)?;
        self.get(table)
            .map(|t| t.rows.clone())
            .ok_or_else(|| anyhow!("unknown table: {}", table))
    }
}
