//! Transactional application of an ordered batch of changes.

use crate::error::{EngineError, EngineResult};
use crate::ledger::{Ledger, SchemaStatus};
use serde::{Serialize, Serializer};
use std::time::{Duration, Instant};
use tm_core::{order_changes, Change, Task};
use tm_db::Connector;

/// A task whose statements ran during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedTask {
    pub version: String,
    pub task: String,
    pub statements: usize,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// What the ledger table needed before tasks ran.
    pub schema: SchemaStatus,
    /// Tasks applied, in execution order.
    pub applied: Vec<AppliedTask>,
    /// Tasks skipped because the ledger already recorded them.
    pub skipped: usize,
    pub statements_executed: usize,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

impl RunSummary {
    fn new(schema: SchemaStatus) -> Self {
        Self {
            schema,
            applied: Vec::new(),
            skipped: 0,
            statements_executed: 0,
            duration: Duration::ZERO,
        }
    }
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Runs a batch of changes against one connector in one transaction.
///
/// The engine owns the connector and always closes it before [`run`]
/// returns. Nothing is committed unless every task succeeds; the ledger
/// schema DDL is the only work committed earlier.
///
/// [`run`]: Engine::run
pub struct Engine<C: Connector> {
    conn: C,
}

impl<C: Connector> Engine<C> {
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    /// Order, then apply, every change not yet recorded in the ledger.
    ///
    /// Ordering failures close the connector without touching the database.
    /// Any later failure rolls back, closes, and is returned.
    pub fn run(mut self, changes: Vec<Change>) -> EngineResult<RunSummary> {
        let started = Instant::now();
        log::info!(
            "Running {} change(s) on {}",
            changes.len(),
            self.conn.db_type()
        );

        let ordered = match order_changes(changes) {
            Ok(ordered) => ordered,
            Err(err) => {
                self.close();
                return Err(err.into());
            }
        };

        match self.apply(&ordered) {
            Ok(mut summary) => {
                self.close();
                summary.duration = started.elapsed();
                log::info!(
                    "Applied {} task(s), skipped {}, {} statement(s) in {:?}",
                    summary.applied.len(),
                    summary.skipped,
                    summary.statements_executed,
                    summary.duration
                );
                Ok(summary)
            }
            Err(err) => {
                log::error!("Run failed, rolling back: {err}");
                if let Err(e) = self.conn.roll_back() {
                    log::warn!("Rollback failed: {e}");
                }
                self.close();
                Err(err)
            }
        }
    }

    fn apply(&mut self, changes: &[Change]) -> EngineResult<RunSummary> {
        let schema = Ledger::ensure_schema(&mut self.conn)
            .map_err(|source| EngineError::Schema { source })?;
        let mut summary = RunSummary::new(schema);

        for change in changes {
            log::debug!("Change {}", change.version());
            for task in change.tasks() {
                self.apply_task(change.version(), task, &mut summary)?;
            }
        }

        self.conn
            .commit()
            .map_err(|source| EngineError::Commit { source })?;
        Ok(summary)
    }

    fn apply_task(
        &mut self,
        version: &str,
        task: &Task,
        summary: &mut RunSummary,
    ) -> EngineResult<()> {
        let text = task.fingerprint_text();

        if Ledger::exists(&mut self.conn, version, task.name(), &text)
            .map_err(|source| EngineError::ledger(version, task.name(), source))?
        {
            log::debug!("Skipping {version}/{}: already applied", task.name());
            summary.skipped += 1;
            return Ok(());
        }

        log::info!("Applying {version}/{}", task.name());
        for statement in task.statements() {
            self.conn.execute_statement(statement).map_err(|source| {
                EngineError::StatementExecution {
                    version: version.to_string(),
                    task: task.name().to_string(),
                    statement: statement.clone(),
                    source,
                }
            })?;
        }
        summary.statements_executed += task.statements().len();

        Ledger::record(&mut self.conn, version, task.name(), &text)
            .map_err(|source| EngineError::ledger(version, task.name(), source))?;
        summary.applied.push(AppliedTask {
            version: version.to_string(),
            task: task.name().to_string(),
            statements: task.statements().len(),
        });
        Ok(())
    }

    fn close(&mut self) {
        if let Err(e) = self.conn.close() {
            log::warn!("Closing {} connection failed: {e}", self.conn.db_type());
        }
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
