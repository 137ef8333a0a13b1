//! Multi-row INSERT rendering.

use crate::dialect::SqlDialect;
use crate::value::{Row, Value};

/// Rows per INSERT statement unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Render one INSERT statement for a batch of rows.
///
/// The column list comes from the first row of the batch and every tuple is
/// emitted in that order. Columns absent from a later row encode as NULL;
/// columns only present in later rows are not emitted.
pub fn insert_statement(dialect: SqlDialect, table: &str, rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };
    let columns: Vec<&str> = first.column_names().collect();

    let mut out = String::with_capacity(64 + rows.len() * columns.len() * 8);
    out.push_str("INSERT INTO ");
    out.push_str(&dialect.quote_ident(table));
    out.push_str(" (");
    for (i, col) in columns.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&dialect.quote_ident(col));
    }
    out.push_str(") VALUES\n");

    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            out.push_str(",\n");
        }
        out.push('(');
        for (j, col) in columns.iter().enumerate() {
            if j > 0 {
                out.push_str(", ");
            }
            row.get(col).unwrap_or(&Value::Null).write_sql(&mut out, dialect);
        }
        out.push(')');
    }

    out.push(';');
    out
}

/// Split rows into batches and render one INSERT per batch
pub fn insert_statements<'a>(
    dialect: SqlDialect,
    table: &'a str,
    rows: &'a [Row],
    batch_size: usize,
) -> impl Iterator<Item = String> + 'a {
    rows.chunks(batch_size.max(1))
        .map(move |chunk| insert_statement(dialect, table, chunk))
}
