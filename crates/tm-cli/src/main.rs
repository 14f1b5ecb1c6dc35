//! Tidemark CLI - apply versioned SQL changesets exactly once

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

mod cli;
mod commands;

use cli::Cli;
use commands::{common, run, status, validate};

#[tokio::main]
async fn main() -> ExitCode {
    match dispatch().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(common::exit_code(&err))
        }
    }
}

async fn dispatch() -> Result<()> {
    let cli = Cli::parse();
    let project = common::load_project(&cli.global)?;
    common::init_logging(&cli.global, &project.config);

    match &cli.command {
        cli::Commands::Run(args) => run::execute(args, &project).await,
        cli::Commands::Validate(args) => validate::execute(args, &project).await,
        cli::Commands::Status(args) => status::execute(args, &project).await,
    }
}
