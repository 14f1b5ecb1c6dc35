//! Shared helpers for CLI commands

use crate::cli::GlobalArgs;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tm_core::{Config, ResourceDirs};
use tm_engine::{EngineError, Migrator};

/// A project directory and its resolved configuration.
#[derive(Debug, Clone)]
pub(crate) struct Project {
    pub root: PathBuf,
    pub config: Config,
}

impl Project {
    /// Changeset location: the CLI override if given, else the config value.
    pub fn changeset_path(&self, changeset: Option<&str>) -> PathBuf {
        match changeset {
            Some(path) => resolve(&self.root, path),
            None => self.config.changeset_path(&self.root),
        }
    }

    /// Database location: the CLI override if given, else the config value.
    pub fn database_path(&self, database: Option<&str>) -> String {
        match database {
            Some(":memory:") => ":memory:".to_string(),
            Some(path) => resolve(&self.root, path).display().to_string(),
            None => self.config.database_path(&self.root),
        }
    }

    /// A migrator reading `changeset`, resolving `classpath:` references
    /// against the configured resource directories.
    pub fn migrator(&self, changeset: Option<&str>) -> Migrator {
        Migrator::new()
            .with_path(self.changeset_path(changeset))
            .with_resources(ResourceDirs::new(
                self.config.resource_paths_absolute(&self.root),
            ))
            .with_dev_mode(self.config.dev_mode)
    }
}

fn resolve(root: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

/// Load the project from `--project-dir`, honouring `--config`.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    let root = PathBuf::from(&global.project_dir);
    let config = match &global.config {
        Some(path) => {
            Config::load(Path::new(path)).with_context(|| format!("Failed to load config {path}"))?
        }
        None => Config::load_from_dir(&root)
            .with_context(|| format!("Failed to load config from {}", root.display()))?,
    };
    Ok(Project { root, config })
}

/// Initialise `env_logger`.
///
/// `--verbose` forces debug; otherwise the config's `log_level` applies.
/// `RUST_LOG` directives are layered on top.
pub(crate) fn init_logging(global: &GlobalArgs, config: &Config) {
    let level = if global.verbose {
        log::LevelFilter::Debug
    } else {
        parse_level(&config.log_level)
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false)
        .init();
}

fn parse_level(level: &str) -> log::LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "off" => log::LevelFilter::Off,
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    }
}

/// Process exit code for a failed command.
///
/// 2: the changeset was rejected before any statement ran.
/// 3: a run failed and its transaction was rolled back.
/// 1: anything else (configuration, I/O, database access).
pub(crate) fn exit_code(err: &anyhow::Error) -> u8 {
    match err.chain().find_map(|e| e.downcast_ref::<EngineError>()) {
        Some(e) if e.is_pre_execution() => 2,
        Some(_) => 3,
        None => 1,
    }
}

/// Pretty-print `value` as JSON on stdout.
pub(crate) fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
