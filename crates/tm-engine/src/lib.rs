//! tm-engine - Execution engine for Tidemark
//!
//! Applies an ordered batch of changes through a [`tm_db::Connector`] in a
//! single transaction, consulting and updating the `change_set` ledger so
//! each task runs at most once per distinct content.

pub mod engine;
pub mod error;
pub mod ledger;
pub mod migrator;

pub use engine::{AppliedTask, Engine, RunSummary};
pub use error::{EngineError, EngineResult};
pub use ledger::{Ledger, LedgerRecord, SchemaStatus, LEDGER_TABLE};
pub use migrator::{Migrator, RunOutcome};
