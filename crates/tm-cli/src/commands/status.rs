//! Status command implementation

use crate::cli::{OutputFormat, StatusArgs};
use crate::commands::common::{self, Project};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tm_core::Change;
use tm_db::{Connector, DuckDbConnector};
use tm_engine::{Ledger, LedgerRecord};

/// Where a task stands relative to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum TaskState {
    Applied,
    /// Recorded, but with different statements; the next run applies it again.
    Changed,
    Pending,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            TaskState::Applied => "applied",
            TaskState::Changed => "changed",
            TaskState::Pending => "pending",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TaskStatus {
    pub version: String,
    pub task: String,
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_on: Option<String>,
}

/// Match every task of `changes` against the ledger `records`.
pub(crate) fn task_states(changes: &[Change], records: &[LedgerRecord]) -> Vec<TaskStatus> {
    let mut statuses = Vec::new();
    for change in changes {
        for task in change.tasks() {
            let fingerprint = task.fingerprint();
            let recorded: Vec<&LedgerRecord> = records
                .iter()
                .filter(|r| r.version == change.version() && r.task == task.name())
                .collect();

            let (state, applied_on) = match recorded
                .iter()
                .find(|r| r.query_hash.is_none() || r.query_hash == Some(fingerprint))
            {
                Some(record) => (TaskState::Applied, record.applied.map(|d| d.to_string())),
                None if !recorded.is_empty() => (TaskState::Changed, None),
                None => (TaskState::Pending, None),
            };

            statuses.push(TaskStatus {
                version: change.version().to_string(),
                task: task.name().to_string(),
                state,
                applied_on,
            });
        }
    }
    statuses
}

/// Read the ledger without modifying anything. A missing database file is
/// an empty ledger and is not created.
fn read_ledger(database: &str) -> Result<Vec<LedgerRecord>> {
    if database != ":memory:" && !Path::new(database).exists() {
        log::debug!("Database {database} does not exist yet");
        return Ok(Vec::new());
    }
    let mut conn = DuckDbConnector::new(database)
        .with_context(|| format!("Failed to open database {database}"))?;
    let records = Ledger::records(&mut conn).context("Failed to read ledger");
    if let Err(e) = conn.close() {
        log::warn!("Closing database {database} failed: {e}");
    }
    records
}

/// Execute the status command
pub(crate) async fn execute(args: &StatusArgs, project: &Project) -> Result<()> {
    let mut migrator = project
        .migrator(args.changeset.as_deref())
        .with_dev_mode(false);
    let database = project.database_path(args.database.as_deref());

    let statuses = tokio::task::spawn_blocking(move || -> Result<Vec<TaskStatus>> {
        let changes = migrator.parse().context("Failed to load changeset")?;
        let records = read_ledger(&database)?;
        Ok(task_states(changes, &records))
    })
    .await
    .context("Status task panicked")??;

    match args.output {
        OutputFormat::Json => common::print_json(&statuses)?,
        OutputFormat::Text => {
            for status in &statuses {
                match &status.applied_on {
                    Some(date) => println!(
                        "  {:<8} {} / {} ({date})",
                        status.state, status.version, status.task
                    ),
                    None => println!("  {:<8} {} / {}", status.state, status.version, status.task),
                }
            }
            let pending = statuses
                .iter()
                .filter(|s| s.state != TaskState::Applied)
                .count();
            println!("\n{} task(s), {pending} to apply", statuses.len());
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "status_test.rs"]
mod tests;
