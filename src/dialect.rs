//! Target SQL dialects for snapshot output.
//!
//! The dialect decides identifier quoting, how referential integrity is
//! switched off for the duration of the load, and the few literal encodings
//! that differ between engines.

use serde::{Deserialize, Serialize};

/// SQL dialect of the generated script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    /// MySQL / MariaDB (default)
    #[default]
    MySql,
    /// PostgreSQL
    Postgres,
    /// SQLite
    Sqlite,
}

impl std::str::FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(SqlDialect::MySql),
            "postgres" | "postgresql" | "pg" => Ok(SqlDialect::Postgres),
            "sqlite" | "sqlite3" => Ok(SqlDialect::Sqlite),
            _ => Err(format!(
                "Unknown dialect: {}. Valid options: mysql, postgres, sqlite",
                s
            )),
        }
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlDialect::MySql => write!(f, "mysql"),
            SqlDialect::Postgres => write!(f, "postgres"),
            SqlDialect::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl SqlDialect {
    /// Quote an identifier, doubling any embedded quote character
    pub fn quote_ident(&self, name: &str) -> String {
        let q = match self {
            SqlDialect::MySql => '`',
            SqlDialect::Postgres | SqlDialect::Sqlite => '"',
        };
        let mut out = String::with_capacity(name.len() + 2);
        out.push(q);
        for c in name.chars() {
            if c == q {
                out.push(q);
            }
            out.push(c);
        }
        out.push(q);
        out
    }

    /// Statements that create and select the target schema
    pub fn schema_preamble(&self, schema: &str) -> Vec<String> {
        let quoted = self.quote_ident(schema);
        match self {
            SqlDialect::MySql => vec![
                format!("CREATE SCHEMA IF NOT EXISTS {};", quoted),
                format!("USE {};", quoted),
            ],
            SqlDialect::Postgres => vec![
                format!("CREATE SCHEMA IF NOT EXISTS {};", quoted),
                format!("SET search_path TO {};", quoted),
            ],
            // SQLite has a single schema per database file
            SqlDialect::Sqlite => Vec::new(),
        }
    }

    /// Statement that suspends foreign key enforcement
    pub fn disable_integrity(&self) -> &'static str {
        match self {
            SqlDialect::MySql => "SET FOREIGN_KEY_CHECKS = 0;",
            SqlDialect::Postgres => "SET session_replication_role = replica;",
            SqlDialect::Sqlite => "PRAGMA foreign_keys = OFF;",
        }
    }

    /// Statement that restores foreign key enforcement
    pub fn enable_integrity(&self) -> &'static str {
        match self {
            SqlDialect::MySql => "SET FOREIGN_KEY_CHECKS = 1;",
            SqlDialect::Postgres => "SET session_replication_role = DEFAULT;",
            SqlDialect::Sqlite => "PRAGMA foreign_keys = ON;",
        }
    }

    /// DROP statement for a table
    pub fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {};", self.quote_ident(table))
    }

    /// Boolean literal
    pub fn bool_literal(&self, value: bool) -> &'static str {
        match (self, value) {
            (SqlDialect::Postgres, true) => "TRUE",
            (SqlDialect::Postgres, false) => "FALSE",
            (_, true) => "1",
            (_, false) => "0",
        }
    }

    /// Whether backslash is an escape character inside string literals
    pub fn backslash_escapes(&self) -> bool {
        matches!(self, SqlDialect::MySql)
    }
}
