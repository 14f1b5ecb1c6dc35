//! DuckDB connector implementation

use crate::error::{DbError, DbResult};
use crate::traits::{Connector, SqlValue};
use chrono::{Duration, NaiveDate};
use duckdb::types::{ToSql, ToSqlOutput, Value, ValueRef};
use duckdb::{params_from_iter, Connection};
use std::path::Path;

/// DuckDB connector.
///
/// Opens an explicit transaction on construction and after every commit or
/// rollback, so nothing is durable until [`Connector::commit`].
/// Single-threaded: the engine owns the connector for the whole run, so no
/// `Mutex` is needed.
pub struct DuckDbConnector {
    conn: Option<Connection>,
}

impl DuckDbConnector {
    /// Create a new in-memory DuckDB connector
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Create a new DuckDB connector from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Self::from_connection(conn)
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Wrap an existing connection, turning auto-commit off.
    pub fn from_connection(conn: Connection) -> DbResult<Self> {
        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::transaction("begin", e))?;
        Ok(Self { conn: Some(conn) })
    }

    /// Whether [`Connector::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    fn conn(&self) -> DbResult<&Connection> {
        self.conn.as_ref().ok_or(DbError::Closed)
    }

    /// End the current transaction with `verb` and open the next one.
    fn end_transaction(&mut self, verb: &str) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(verb)
            .map_err(|e| DbError::transaction(&verb.to_ascii_lowercase(), e))?;
        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::transaction("begin", e))
    }

    fn count(&self, sql: &str, params: &[SqlValue]) -> DbResult<i64> {
        self.conn()?
            .query_row(sql, params_from_iter(params.iter()), |row| row.get(0))
            .map_err(|e| DbError::SchemaInspection(format!("{e}: {sql}")))
    }
}

/// Split an optionally schema-qualified name into `(schema, table)`.
fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.rfind('.') {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

impl Connector for DuckDbConnector {
    fn execute_statement(&mut self, sql: &str) -> DbResult<()> {
        if sql.trim().is_empty() {
            log::debug!("Skipping blank statement");
            return Ok(());
        }
        log::debug!("Executing statement: {sql}");
        self.conn()?
            .execute_batch(sql)
            .map_err(|e| DbError::execution(sql, e))
    }

    fn execute_prepared(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(|e| DbError::execution(sql, e))?;
        stmt.execute(params_from_iter(params.iter()))
            .map_err(|e| DbError::execution(sql, e))
    }

    fn query_exists(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<bool> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(|e| DbError::execution(sql, e))?;
        let mut rows = stmt
            .query(params_from_iter(params.iter()))
            .map_err(|e| DbError::execution(sql, e))?;
        let first = rows.next().map_err(|e| DbError::execution(sql, e))?;
        Ok(first.is_some())
    }

    fn query_rows(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Vec<SqlValue>>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(|e| DbError::execution(sql, e))?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                let col_count = row.as_ref().column_count();
                (0..col_count)
                    .map(|i| row.get::<_, Value>(i).map(from_duckdb_value))
                    .collect::<Result<Vec<_>, _>>()
            })
            .map_err(|e| DbError::execution(sql, e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::execution(sql, e))?;
        Ok(rows)
    }

    fn commit(&mut self) -> DbResult<()> {
        log::debug!("Committing transaction");
        self.end_transaction("COMMIT")
    }

    fn roll_back(&mut self) -> DbResult<()> {
        log::debug!("Rolling back transaction");
        self.end_transaction("ROLLBACK")
    }

    fn close(&mut self) -> DbResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        if let Err(e) = conn.execute_batch("ROLLBACK") {
            log::debug!("Nothing to roll back on close: {e}");
        }
        conn.close()
            .map_err(|(_, e)| DbError::ConnectionError(format!("close failed: {e}")))
    }

    fn table_exists(&mut self, name: &str) -> DbResult<bool> {
        let (schema, table) = split_qualified(name);
        let count = match schema {
            Some(schema) => self.count(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE lower(table_schema) = lower(?) AND lower(table_name) = lower(?)",
                &[schema.into(), table.into()],
            )?,
            None => self.count(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND lower(table_name) = lower(?)",
                &[table.into()],
            )?,
        };
        Ok(count > 0)
    }

    fn column_exists(&mut self, table: &str, column: &str) -> DbResult<bool> {
        let (schema, table) = split_qualified(table);
        let count = match schema {
            Some(schema) => self.count(
                "SELECT COUNT(*) FROM information_schema.columns \
                 WHERE lower(table_schema) = lower(?) AND lower(table_name) = lower(?) \
                 AND lower(column_name) = lower(?)",
                &[schema.into(), table.into(), column.into()],
            )?,
            None => self.count(
                "SELECT COUNT(*) FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND lower(table_name) = lower(?) \
                 AND lower(column_name) = lower(?)",
                &[table.into(), column.into()],
            )?,
        };
        Ok(count > 0)
    }

    fn alter_add_column(&mut self, table: &str, column: &str, sql_type: &str) -> DbResult<()> {
        let sql = format!("ALTER TABLE {table} ADD COLUMN {column} {sql_type}");
        self.execute_statement(&sql)
    }

    fn create_table(&mut self, ddl: &str) -> DbResult<()> {
        self.execute_statement(ddl)
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::BigInt(n) => ToSqlOutput::Owned(Value::BigInt(*n)),
            SqlValue::Date(d) => ToSqlOutput::Owned(Value::Text(d.format("%Y-%m-%d").to_string())),
        })
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

/// Map a DuckDB value onto the small set of types the ledger reads back.
fn from_duckdb_value(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Text(s) => SqlValue::Text(s),
        Value::TinyInt(n) => SqlValue::BigInt(n.into()),
        Value::SmallInt(n) => SqlValue::BigInt(n.into()),
        Value::Int(n) => SqlValue::BigInt(n.into()),
        Value::BigInt(n) => SqlValue::BigInt(n),
        Value::UTinyInt(n) => SqlValue::BigInt(n.into()),
        Value::USmallInt(n) => SqlValue::BigInt(n.into()),
        Value::UInt(n) => SqlValue::BigInt(n.into()),
        Value::Date32(days) => epoch()
            .checked_add_signed(Duration::days(days.into()))
            .map_or(SqlValue::Null, SqlValue::Date),
        other => SqlValue::Text(format!("{other:?}")),
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
