//! Typed cell values and their SQL literal encoding.

use crate::dialect::SqlDialect;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};

/// A single cell from a result set
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    /// Exact numeric text (DECIMAL, HUGEINT, unsigned values beyond i64)
    Decimal(String),
    Bool(bool),
    /// Wall-clock date/time, no zone
    Timestamp(NaiveDateTime),
    Text(String),
}

impl Value {
    /// Build a timestamp from a zoned value, normalized to UTC wall-clock time
    pub fn from_zoned<Tz: TimeZone>(value: DateTime<Tz>) -> Self {
        Value::Timestamp(value.naive_utc())
    }

    /// Build a timestamp at midnight from a date
    pub fn from_date(date: NaiveDate) -> Self {
        Value::Timestamp(date.and_time(chrono::NaiveTime::MIN))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Encode as a SQL literal for the given dialect
    pub fn to_sql(&self, dialect: SqlDialect) -> String {
        let mut out = String::new();
        self.write_sql(&mut out, dialect);
        out
    }

    /// Append the SQL literal for this value to `out`
    pub fn write_sql(&self, out: &mut String, dialect: SqlDialect) {
        match self {
            Value::Null => out.push_str("NULL"),
            Value::Int(n) => out.push_str(&n.to_string()),
            Value::Float(f) if f.is_finite() => out.push_str(&f.to_string()),
            Value::Float(_) => out.push_str("NULL"),
            Value::Decimal(d) => out.push_str(d),
            Value::Bool(b) => out.push_str(dialect.bool_literal(*b)),
            Value::Timestamp(ts) => {
                out.push('\'');
                out.push_str(&ts.format("%Y-%m-%d %H:%M:%S").to_string());
                out.push('\'');
            }
            Value::Text(s) => write_string_literal(out, s, dialect),
        }
    }
}

/// Append a single-quoted string literal. Quotes are doubled; on engines that
/// treat backslash as an escape character, backslashes and NUL are escaped too.
pub fn write_string_literal(out: &mut String, s: &str, dialect: SqlDialect) {
    out.reserve(s.len() + 2);
    out.push('\'');
    if dialect.backslash_escapes() {
        for c in s.chars() {
            match c {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                '\0' => out.push_str("\\0"),
                _ => out.push(c),
            }
        }
    } else {
        for c in s.chars() {
            if c == '\'' {
                out.push('\'');
            }
            out.push(c);
        }
    }
    out.push('\'');
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(n) => Value::Int(n),
            Err(_) => Value::Decimal(v.to_string()),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A result-set row: column names mapped to values, in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column append
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    /// Append a column, replacing the value if the column already exists
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    /// Look up a value by column name
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    /// Column names in row order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, v)| (name.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.push(k, v);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate};

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_reference_encodings() {
        let d = SqlDialect::MySql;
        assert_eq!(Value::Null.to_sql(d), "NULL");
        assert_eq!(Value::Int(42).to_sql(d), "42");
        assert_eq!(Value::Float(3.14).to_sql(d), "3.14");
        assert_eq!(Value::Bool(true).to_sql(d), "1");
        assert_eq!(Value::Bool(false).to_sql(d), "0");
        assert_eq!(
            Value::Timestamp(ts(2024, 1, 15, 10, 30, 0)).to_sql(d),
            "'2024-01-15 10:30:00'"
        );
        assert_eq!(Value::from("O'Brien").to_sql(d), "'O''Brien'");
    }

    #[test]
    fn test_timestamp_truncates_fraction() {
        let with_millis = ts(2024, 1, 15, 10, 30, 0)
            + chrono::Duration::milliseconds(999);
        assert_eq!(
            Value::Timestamp(with_millis).to_sql(SqlDialect::MySql),
            "'2024-01-15 10:30:00'"
        );
    }

    #[test]
    fn test_zoned_values_normalize_to_utc() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let zoned = offset
            .from_local_datetime(&ts(2024, 1, 15, 12, 0, 0))
            .unwrap();
        assert_eq!(
            Value::from_zoned(zoned).to_sql(SqlDialect::MySql),
            "'2024-01-15 10:00:00'"
        );
    }

    #[test]
    fn test_backslash_handling_by_dialect() {
        let v = Value::from(r"C:\temp\it's");
        assert_eq!(v.to_sql(SqlDialect::MySql), r"'C:\\temp\\it''s'");
        assert_eq!(v.to_sql(SqlDialect::Postgres), r"'C:\temp\it''s'");
        assert_eq!(v.to_sql(SqlDialect::Sqlite), r"'C:\temp\it''s'");
    }

    #[test]
    fn test_non_finite_float_is_null() {
        assert_eq!(Value::Float(f64::NAN).to_sql(SqlDialect::MySql), "NULL");
        assert_eq!(
            Value::Float(f64::INFINITY).to_sql(SqlDialect::MySql),
            "NULL"
        );
    }

    #[test]
    fn test_postgres_booleans() {
        assert_eq!(Value::Bool(true).to_sql(SqlDialect::Postgres), "TRUE");
        assert_eq!(Value::Bool(false).to_sql(SqlDialect::Postgres), "FALSE");
    }

    #[test]
    fn test_large_unsigned_stays_exact() {
        assert_eq!(Value::from(u64::MAX).to_sql(SqlDialect::MySql), "18446744073709551615");
        assert_eq!(Value::from(7u64), Value::Int(7));
    }

    #[test]
    fn test_row_lookup_and_replace() {
        let mut row = Row::new().with("id", 1).with("name", "alice");
        row.push("name", "bob");
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("name"), Some(&Value::from("bob")));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.column_names().collect::<Vec<_>>(), vec!["id", "name"]);
    }
}
