//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Tidemark - apply versioned SQL changesets exactly once
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply every pending task in one transaction
    Run(RunArgs),

    /// Load and order the changeset without touching the database
    Validate(ValidateArgs),

    /// Show which tasks are applied and which are pending
    Status(StatusArgs),
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Changeset file or directory (overrides config)
    #[arg(long)]
    pub changeset: Option<String>,

    /// DuckDB database path or :memory: (overrides config)
    #[arg(short, long, env = "TIDEMARK_DATABASE")]
    pub database: Option<String>,

    /// Skip parsing and execution entirely
    #[arg(long)]
    pub dev_mode: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Changeset file or directory (overrides config)
    #[arg(long)]
    pub changeset: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Changeset file or directory (overrides config)
    #[arg(long)]
    pub changeset: Option<String>,

    /// DuckDB database path (overrides config)
    #[arg(short, long, env = "TIDEMARK_DATABASE")]
    pub database: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
