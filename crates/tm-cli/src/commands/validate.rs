//! Validate command implementation

use crate::cli::{OutputFormat, ValidateArgs};
use crate::commands::common::{self, Project};
use anyhow::{Context, Result};
use serde::Serialize;
use tm_core::Change;

#[derive(Debug, Serialize)]
struct ChangeView<'a> {
    version: &'a str,
    statements: usize,
    tasks: Vec<TaskView<'a>>,
}

#[derive(Debug, Serialize)]
struct TaskView<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<i64>,
    statements: usize,
}

fn view(change: &Change) -> ChangeView<'_> {
    ChangeView {
        version: change.version(),
        statements: change.statement_count(),
        tasks: change
            .tasks()
            .iter()
            .map(|t| TaskView {
                name: t.name(),
                order: t.has_explicit_order().then_some(t.order()),
                statements: t.statements().len(),
            })
            .collect(),
    }
}

/// Execute the validate command
pub(crate) async fn execute(args: &ValidateArgs, project: &Project) -> Result<()> {
    let changeset = project.changeset_path(args.changeset.as_deref());
    let mut migrator = project
        .migrator(args.changeset.as_deref())
        .with_dev_mode(false);

    let changes = migrator
        .parse()
        .with_context(|| format!("Changeset {} is invalid", changeset.display()))?;
    let views: Vec<ChangeView<'_>> = changes.iter().map(view).collect();

    match args.output {
        OutputFormat::Json => common::print_json(&views)?,
        OutputFormat::Text => {
            for change in &views {
                println!("{} ({} statement(s))", change.version, change.statements);
                for task in &change.tasks {
                    println!("  {} ({} statement(s))", task.name, task.statements);
                }
            }
            let tasks: usize = views.iter().map(|c| c.tasks.len()).sum();
            println!(
                "\n{} is valid: {} change(s), {} task(s)",
                changeset.display(),
                views.len(),
                tasks
            );
        }
    }
    Ok(())
}
