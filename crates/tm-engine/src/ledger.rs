//! The `change_set` ledger table.
//!
//! One row per applied (version, task) pair, carrying the fingerprint of the
//! task's statements and the date it was applied. Rows are only ever
//! inserted; the table is created or widened in place and never dropped.

use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::cmp::Ordering;
use tm_core::{fingerprint, VersionKey};
use tm_db::{Connector, DbResult, SqlValue};

/// Ledger table name.
pub const LEDGER_TABLE: &str = "change_set";

/// A ledger column and its SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerColumn {
    pub name: &'static str,
    pub sql_type: &'static str,
}

/// Current ledger columns, in table order.
pub const LEDGER_COLUMNS: &[LedgerColumn] = &[
    LedgerColumn {
        name: "version",
        sql_type: "VARCHAR(255)",
    },
    LedgerColumn {
        name: "task",
        sql_type: "VARCHAR(255)",
    },
    LedgerColumn {
        name: "query_hash",
        sql_type: "BIGINT",
    },
    LedgerColumn {
        name: "applied",
        sql_type: "DATE",
    },
];

const EXISTS_SQL: &str = "SELECT 1 FROM change_set \
     WHERE version = ? AND task = ? AND (query_hash = ? OR query_hash IS NULL)";

const INSERT_SQL: &str =
    "INSERT INTO change_set (version, task, query_hash, applied) VALUES (?, ?, ?, ?)";

/// What [`Ledger::ensure_schema`] had to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaStatus {
    /// The table did not exist and was created.
    Created,
    /// The table existed without these columns; they were added.
    Evolved(Vec<&'static str>),
    /// Nothing to do.
    Current,
}

/// One ledger row as read back by [`Ledger::records`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRecord {
    pub version: String,
    pub task: String,
    /// `None` for rows written before fingerprints were tracked.
    pub query_hash: Option<i64>,
    pub applied: Option<NaiveDate>,
}

/// Ledger operations over a [`Connector`].
pub struct Ledger;

impl Ledger {
    /// `CREATE TABLE` statement for the current column set.
    pub fn create_table_ddl() -> String {
        let columns = LEDGER_COLUMNS
            .iter()
            .map(|c| format!("{} {}", c.name, c.sql_type))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE {LEDGER_TABLE} ({columns})")
    }

    /// Create the ledger table, or add any columns an older table lacks.
    ///
    /// DDL is committed straight away. Existing rows are preserved; added
    /// columns are NULL for them. A current table is left untouched.
    pub fn ensure_schema(conn: &mut dyn Connector) -> DbResult<SchemaStatus> {
        if !conn.table_exists(LEDGER_TABLE)? {
            conn.create_table(&Self::create_table_ddl())?;
            conn.commit()?;
            log::info!("Created ledger table {LEDGER_TABLE}");
            return Ok(SchemaStatus::Created);
        }

        let mut added = Vec::new();
        for column in LEDGER_COLUMNS {
            if !conn.column_exists(LEDGER_TABLE, column.name)? {
                conn.alter_add_column(LEDGER_TABLE, column.name, column.sql_type)?;
                added.push(column.name);
            }
        }

        if added.is_empty() {
            log::debug!("Ledger table {LEDGER_TABLE} is current");
            return Ok(SchemaStatus::Current);
        }

        conn.commit()?;
        log::info!(
            "Added column(s) {} to ledger table {LEDGER_TABLE}",
            added.join(", ")
        );
        Ok(SchemaStatus::Evolved(added))
    }

    /// Whether `task` of `version` is already applied with statements `text`.
    ///
    /// Rows without a fingerprint count as applied whatever their content.
    pub fn exists(
        conn: &mut dyn Connector,
        version: &str,
        task: &str,
        text: &str,
    ) -> DbResult<bool> {
        conn.query_exists(
            EXISTS_SQL,
            &[
                version.into(),
                task.into(),
                SqlValue::BigInt(fingerprint(text)),
            ],
        )
    }

    /// Insert a row for `task` of `version`, dated today.
    pub fn record(conn: &mut dyn Connector, version: &str, task: &str, text: &str) -> DbResult<()> {
        Self::record_on(conn, version, task, text, Local::now().date_naive())
    }

    /// Insert a row for `task` of `version` with an explicit date.
    pub fn record_on(
        conn: &mut dyn Connector,
        version: &str,
        task: &str,
        text: &str,
        applied: NaiveDate,
    ) -> DbResult<()> {
        conn.execute_prepared(
            INSERT_SQL,
            &[
                version.into(),
                task.into(),
                SqlValue::BigInt(fingerprint(text)),
                applied.into(),
            ],
        )?;
        Ok(())
    }

    /// Every ledger row, ordered by version then task name.
    ///
    /// Returns an empty list when the table does not exist. Does not modify
    /// the schema, so tables predating the fingerprint column read back with
    /// `query_hash: None`.
    pub fn records(conn: &mut dyn Connector) -> DbResult<Vec<LedgerRecord>> {
        if !conn.table_exists(LEDGER_TABLE)? {
            return Ok(Vec::new());
        }
        let hash = if conn.column_exists(LEDGER_TABLE, "query_hash")? {
            "query_hash"
        } else {
            "NULL"
        };
        let applied = if conn.column_exists(LEDGER_TABLE, "applied")? {
            "applied"
        } else {
            "NULL"
        };
        let sql = format!("SELECT version, task, {hash}, {applied} FROM {LEDGER_TABLE}");

        let mut records: Vec<LedgerRecord> = conn
            .query_rows(&sql, &[])?
            .into_iter()
            .map(|row| {
                let text = |i: usize| {
                    row.get(i)
                        .and_then(SqlValue::as_text)
                        .unwrap_or_default()
                        .to_string()
                };
                LedgerRecord {
                    version: text(0),
                    task: text(1),
                    query_hash: row.get(2).and_then(SqlValue::as_i64),
                    applied: match row.get(3) {
                        Some(SqlValue::Date(d)) => Some(*d),
                        _ => None,
                    },
                }
            })
            .collect();
        records.sort_by(compare_records);
        Ok(records)
    }
}

/// Version-key order, falling back to string order for versions that do not
/// parse; malformed versions sort after well-formed ones.
fn compare_records(a: &LedgerRecord, b: &LedgerRecord) -> Ordering {
    let by_version = match (VersionKey::parse(&a.version), VersionKey::parse(&b.version)) {
        (Ok(ka), Ok(kb)) => ka.cmp(&kb).then_with(|| a.version.cmp(&b.version)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.version.cmp(&b.version),
    };
    by_version.then_with(|| a.task.cmp(&b.task))
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
