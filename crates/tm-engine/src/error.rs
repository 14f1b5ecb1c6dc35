//! Error types for tm-engine

use thiserror::Error;
use tm_core::CoreError;
use tm_db::DbError;

/// Engine errors.
///
/// Every variant raised after the connector has been handed to the engine is
/// surfaced only after the transaction has been rolled back and the connector
/// closed.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Loading, ordering, or resolving the changeset failed. No database
    /// mutation has happened.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The ledger table could not be created or brought up to date (X001)
    #[error("[X001] Ledger schema could not be ensured: {source}")]
    Schema {
        #[source]
        source: DbError,
    },

    /// A task statement failed (X002)
    #[error("[X002] Statement failed in change '{version}', task '{task}': {source}\n  statement: {statement}")]
    StatementExecution {
        version: String,
        task: String,
        statement: String,
        #[source]
        source: DbError,
    },

    /// The ledger lookup or insert for a task failed (X003)
    #[error("[X003] Ledger access failed for change '{version}', task '{task}': {source}")]
    LedgerWrite {
        version: String,
        task: String,
        #[source]
        source: DbError,
    },

    /// The final commit failed (X004)
    #[error("[X004] Commit failed: {source}")]
    Commit {
        #[source]
        source: DbError,
    },

    /// No changeset source was configured (X005)
    #[error("[X005] No changeset source configured")]
    MissingSource,

    /// `execute` was called before a successful `parse` (X006)
    #[error("[X006] No parsed changeset to execute; call parse first")]
    NotParsed,
}

/// Result type alias for EngineError
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Whether the run failed before any statement reached the database.
    pub fn is_pre_execution(&self) -> bool {
        matches!(
            self,
            EngineError::Core(_) | EngineError::MissingSource | EngineError::NotParsed
        )
    }

    pub(crate) fn ledger(version: &str, task: &str, source: DbError) -> Self {
        EngineError::LedgerWrite {
            version: version.to_string(),
            task: task.to_string(),
            source,
        }
    }
}
