//! Run command implementation

use crate::cli::{OutputFormat, RunArgs};
use crate::commands::common::{self, Project};
use anyhow::{Context, Result};
use tm_db::DuckDbConnector;
use tm_engine::RunOutcome;

/// Execute the run command
pub(crate) async fn execute(args: &RunArgs, project: &Project) -> Result<()> {
    let mut migrator = project.migrator(args.changeset.as_deref());
    if args.dev_mode {
        migrator = migrator.with_dev_mode(true);
    }
    let database = project.database_path(args.database.as_deref());

    log::debug!(
        "Changeset {}, database {database}",
        project.changeset_path(args.changeset.as_deref()).display()
    );

    let outcome = tokio::task::spawn_blocking(move || -> Result<RunOutcome> {
        migrator.parse().context("Failed to load changeset")?;
        if migrator.is_dev_mode() {
            // no database is opened, so none is created
            return Ok(RunOutcome::Skipped);
        }
        let conn = DuckDbConnector::new(&database)
            .with_context(|| format!("Failed to open database {database}"))?;
        migrator.execute(conn).context("Run failed")
    })
    .await
    .context("Run task panicked")??;

    match args.output {
        OutputFormat::Json => common::print_json(&outcome)?,
        OutputFormat::Text => print_outcome(&outcome),
    }
    Ok(())
}

fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Skipped => println!("Dev mode: nothing parsed or executed"),
        RunOutcome::Completed(summary) => {
            for applied in &summary.applied {
                println!(
                    "  applied  {} / {} ({} statement(s))",
                    applied.version, applied.task, applied.statements
                );
            }
            println!(
                "\n{} applied, {} skipped, {} statement(s) in {}ms",
                summary.applied.len(),
                summary.skipped,
                summary.statements_executed,
                summary.duration.as_millis()
            );
        }
    }
}
