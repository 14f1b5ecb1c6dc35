//! In-memory recording connector for engine tests.
//!
//! [`RecordingConnector`] simulates a transactional database closely enough
//! to drive the execution engine: it tracks tables and their columns, keeps
//! committed and pending statements apart, and stores rows inserted through
//! `execute_prepared`. `query_exists` understands the ledger's lookup shape:
//! `[version, task, query_hash]` matches a row with equal version and task
//! whose stored hash is equal or NULL.
//!
//! Tests keep a [`RecordingHandle`] to inspect state after the connector has
//! been moved into the engine.

use crate::error::{DbError, DbResult};
use crate::traits::{Connector, SqlValue};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

/// One call made against the connector, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Execute(String),
    Prepared(String),
    QueryExists(String),
    QueryRows(String),
    Commit,
    RollBack,
    Close,
    TableExists(String),
    ColumnExists(String, String),
    AlterAddColumn(String, String, String),
    CreateTable(String),
}

#[derive(Debug, Default)]
struct Snapshot {
    tables: BTreeMap<String, Vec<String>>,
    rows: Vec<Vec<SqlValue>>,
    statements: Vec<String>,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    committed: Snapshot,
    pending: Snapshot,
    closed: bool,
    fail_statements: HashSet<String>,
    fail_commit: bool,
    fail_close: bool,
    fail_inspection: bool,
    fail_create_table: bool,
}

/// Fake [`Connector`] backed by shared in-memory state.
#[derive(Debug, Default)]
pub struct RecordingConnector {
    state: Rc<RefCell<State>>,
}

/// Read/configure side of a [`RecordingConnector`].
#[derive(Debug, Clone)]
pub struct RecordingHandle {
    state: Rc<RefCell<State>>,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle sharing this connector's state.
    pub fn handle(&self) -> RecordingHandle {
        RecordingHandle {
            state: Rc::clone(&self.state),
        }
    }

    fn check_open(&self) -> DbResult<()> {
        if self.state.borrow().closed {
            Err(DbError::Closed)
        } else {
            Ok(())
        }
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl RecordingHandle {
    /// Every call, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    /// Statements that survived a commit, in execution order.
    pub fn committed_statements(&self) -> Vec<String> {
        self.state.borrow().committed.statements.clone()
    }

    /// Every statement passed to `execute_statement`, including failures and
    /// rolled-back work.
    pub fn executed_statements(&self) -> Vec<String> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Execute(sql) => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    /// Rows inserted and committed through `execute_prepared`.
    pub fn committed_rows(&self) -> Vec<Vec<SqlValue>> {
        self.state.borrow().committed.rows.clone()
    }

    /// Columns of a committed table.
    pub fn committed_columns(&self, table: &str) -> Option<Vec<String>> {
        self.state.borrow().committed.tables.get(table).cloned()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| *c == call)
            .count()
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }

    /// Pre-create a committed table with `columns`.
    pub fn with_table(&self, table: &str, columns: &[&str]) -> &Self {
        let mut state = self.state.borrow_mut();
        let cols: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        state.committed.tables.insert(table.to_string(), cols.clone());
        state.pending.tables.insert(table.to_string(), cols);
        self
    }

    /// Pre-insert a committed row.
    pub fn with_row(&self, row: Vec<SqlValue>) -> &Self {
        let mut state = self.state.borrow_mut();
        state.committed.rows.push(row.clone());
        state.pending.rows.push(row);
        self
    }

    /// Make `execute_statement(sql)` fail.
    pub fn fail_statement(&self, sql: &str) -> &Self {
        self.state
            .borrow_mut()
            .fail_statements
            .insert(sql.to_string());
        self
    }

    pub fn fail_commit(&self) -> &Self {
        self.state.borrow_mut().fail_commit = true;
        self
    }

    pub fn fail_close(&self) -> &Self {
        self.state.borrow_mut().fail_close = true;
        self
    }

    /// Make `table_exists` and `column_exists` fail.
    pub fn fail_inspection(&self) -> &Self {
        self.state.borrow_mut().fail_inspection = true;
        self
    }

    pub fn fail_create_table(&self) -> &Self {
        self.state.borrow_mut().fail_create_table = true;
        self
    }
}

/// Crude `CREATE TABLE name (col type, ...)` parser for the fake.
fn parse_create_table(ddl: &str) -> Option<(String, Vec<String>)> {
    let open = ddl.find('(')?;
    let close = ddl.rfind(')')?;
    let name = ddl[..open].split_whitespace().last()?.to_string();
    let columns = ddl[open + 1..close]
        .split(',')
        .filter_map(|c| c.split_whitespace().next())
        .map(str::to_string)
        .collect();
    Some((name, columns))
}

impl Connector for RecordingConnector {
    fn execute_statement(&mut self, sql: &str) -> DbResult<()> {
        self.check_open()?;
        self.record(Call::Execute(sql.to_string()));
        let mut state = self.state.borrow_mut();
        if state.fail_statements.contains(sql) {
            return Err(DbError::ExecutionError {
                sql: sql.to_string(),
                message: "simulated failure".to_string(),
            });
        }
        state.pending.statements.push(sql.to_string());
        Ok(())
    }

    fn execute_prepared(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        self.check_open()?;
        self.record(Call::Prepared(sql.to_string()));
        self.state.borrow_mut().pending.rows.push(params.to_vec());
        Ok(1)
    }

    fn query_exists(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<bool> {
        self.check_open()?;
        self.record(Call::QueryExists(sql.to_string()));
        let state = self.state.borrow();
        let found = state.pending.rows.iter().any(|row| {
            row.len() >= 3
                && params.len() >= 3
                && row[0] == params[0]
                && row[1] == params[1]
                && (row[2] == params[2] || row[2].is_null())
        });
        Ok(found)
    }

    fn query_rows(&mut self, sql: &str, _params: &[SqlValue]) -> DbResult<Vec<Vec<SqlValue>>> {
        self.check_open()?;
        self.record(Call::QueryRows(sql.to_string()));
        Ok(self.state.borrow().pending.rows.clone())
    }

    fn commit(&mut self) -> DbResult<()> {
        self.check_open()?;
        self.record(Call::Commit);
        let mut state = self.state.borrow_mut();
        if state.fail_commit {
            return Err(DbError::TransactionError {
                operation: "commit".to_string(),
                message: "simulated failure".to_string(),
            });
        }
        state.committed.tables = state.pending.tables.clone();
        state.committed.rows = state.pending.rows.clone();
        state.committed.statements = state.pending.statements.clone();
        Ok(())
    }

    fn roll_back(&mut self) -> DbResult<()> {
        self.check_open()?;
        self.record(Call::RollBack);
        let mut state = self.state.borrow_mut();
        state.pending.tables = state.committed.tables.clone();
        state.pending.rows = state.committed.rows.clone();
        state.pending.statements = state.committed.statements.clone();
        Ok(())
    }

    fn close(&mut self) -> DbResult<()> {
        self.record(Call::Close);
        let mut state = self.state.borrow_mut();
        state.closed = true;
        if state.fail_close {
            return Err(DbError::ConnectionError("simulated close failure".to_string()));
        }
        Ok(())
    }

    fn table_exists(&mut self, name: &str) -> DbResult<bool> {
        self.check_open()?;
        self.record(Call::TableExists(name.to_string()));
        let state = self.state.borrow();
        if state.fail_inspection {
            return Err(DbError::SchemaInspection("simulated failure".to_string()));
        }
        Ok(state.pending.tables.contains_key(name))
    }

    fn column_exists(&mut self, table: &str, column: &str) -> DbResult<bool> {
        self.check_open()?;
        self.record(Call::ColumnExists(table.to_string(), column.to_string()));
        let state = self.state.borrow();
        if state.fail_inspection {
            return Err(DbError::SchemaInspection("simulated failure".to_string()));
        }
        Ok(state
            .pending
            .tables
            .get(table)
            .is_some_and(|cols| cols.iter().any(|c| c == column)))
    }

    fn alter_add_column(&mut self, table: &str, column: &str, sql_type: &str) -> DbResult<()> {
        self.check_open()?;
        self.record(Call::AlterAddColumn(
            table.to_string(),
            column.to_string(),
            sql_type.to_string(),
        ));
        let mut state = self.state.borrow_mut();
        let cols = state
            .pending
            .tables
            .get_mut(table)
            .ok_or_else(|| DbError::TableNotFound(table.to_string()))?;
        cols.push(column.to_string());
        // existing rows gain a NULL in the new column
        for row in &mut state.pending.rows {
            row.push(SqlValue::Null);
        }
        Ok(())
    }

    fn create_table(&mut self, ddl: &str) -> DbResult<()> {
        self.check_open()?;
        self.record(Call::CreateTable(ddl.to_string()));
        let mut state = self.state.borrow_mut();
        if state.fail_create_table {
            return Err(DbError::ExecutionError {
                sql: ddl.to_string(),
                message: "simulated failure".to_string(),
            });
        }
        let (name, columns) = parse_create_table(ddl)
            .ok_or_else(|| DbError::Internal(format!("unparsable DDL: {ddl}")))?;
        state.pending.tables.insert(name, columns);
        Ok(())
    }

    fn db_type(&self) -> &'static str {
        "recording"
    }
}
