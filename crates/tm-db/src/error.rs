//! Error types for tm-db

use thiserror::Error;

/// Database connector errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Statement execution error (D002)
    #[error("[D002] SQL execution failed: {message}: {sql}")]
    ExecutionError { sql: String, message: String },

    /// Table not found (D003)
    #[error("[D003] Table or view not found: {0}")]
    TableNotFound(String),

    /// Commit, rollback, or transaction start failed (D004)
    #[error("[D004] Transaction {operation} failed: {message}")]
    TransactionError { operation: String, message: String },

    /// Schema metadata inspection failed (D005)
    #[error("[D005] Schema inspection failed: {0}")]
    SchemaInspection(String),

    /// Connector used after close (D006)
    #[error("[D006] Connection is closed")]
    Closed,

    /// Internal error (D007)
    #[error("[D007] Internal database error: {0}")]
    Internal(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Build an execution error for `sql`, classifying missing-table failures.
    pub(crate) fn execution(sql: &str, err: duckdb::Error) -> Self {
        // duckdb::Error does not expose structured variants, so the message is
        // the only thing to classify on.
        let msg = err.to_string();
        if msg.contains("Table with name")
            || msg.contains("Table or view with name")
            || (msg.contains("Catalog Error") && msg.contains("Table") && msg.contains("not found"))
        {
            DbError::TableNotFound(msg)
        } else {
            DbError::ExecutionError {
                sql: sql.to_string(),
                message: msg,
            }
        }
    }

    pub(crate) fn transaction(operation: &str, err: duckdb::Error) -> Self {
        DbError::TransactionError {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }
}
