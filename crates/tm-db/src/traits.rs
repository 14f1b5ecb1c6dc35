//! Connector trait definition

use crate::error::DbResult;
use chrono::NaiveDate;
use std::fmt;

/// A bound parameter or a value read back from a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Text(String),
    BigInt(i64),
    Date(NaiveDate),
}

impl SqlValue {
    /// The text payload, if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload, if this is a `BigInt` value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::BigInt(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Text(s) => f.write_str(s),
            SqlValue::BigInt(n) => write!(f, "{n}"),
            SqlValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::BigInt(n)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(d: NaiveDate) -> Self {
        SqlValue::Date(d)
    }
}

/// Blocking, transactional SQL surface driven by the execution engine.
///
/// A connector keeps auto-commit off for its whole lifetime: every call runs
/// inside an open transaction that only [`commit`](Self::commit) makes
/// durable and [`roll_back`](Self::roll_back) discards. Failures are always
/// `Err`; a `false` from an inspection call is an answer, not a failure.
pub trait Connector {
    /// Execute one statement inside the current transaction.
    fn execute_statement(&mut self, sql: &str) -> DbResult<()>;

    /// Execute a parameterized statement, returning affected rows.
    fn execute_prepared(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<usize>;

    /// Whether a parameterized query returns at least one row.
    fn query_exists(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<bool>;

    /// Run a parameterized query and collect every row.
    fn query_rows(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Vec<SqlValue>>>;

    /// Make the current transaction durable and start a new one.
    fn commit(&mut self) -> DbResult<()>;

    /// Discard the current transaction and start a new one.
    fn roll_back(&mut self) -> DbResult<()>;

    /// Close the connection. Uncommitted work is discarded.
    fn close(&mut self) -> DbResult<()>;

    /// Check if a table exists (optionally `schema.table`)
    fn table_exists(&mut self, name: &str) -> DbResult<bool>;

    /// Check if `table` has a column named `column`
    fn column_exists(&mut self, table: &str, column: &str) -> DbResult<bool>;

    /// `ALTER TABLE table ADD COLUMN column sql_type`
    fn alter_add_column(&mut self, table: &str, column: &str, sql_type: &str) -> DbResult<()>;

    /// Execute a `CREATE TABLE` statement
    fn create_table(&mut self, ddl: &str) -> DbResult<()>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}
