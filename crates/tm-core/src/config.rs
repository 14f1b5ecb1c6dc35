//! Project configuration (`tidemark.yml`).

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file names looked up in a project directory, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["tidemark.yml", "tidemark.yaml"];

/// Tidemark project configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Changeset file or directory, relative to the project root
    #[serde(default = "default_changeset")]
    pub changeset: String,

    /// Database connection settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Directories searched for `classpath:` task references
    #[serde(default)]
    pub resource_paths: Vec<String>,

    /// When set, parsing and execution are both skipped
    #[serde(default)]
    pub dev_mode: bool,

    /// Default log level (`error`, `warn`, `info`, `debug`, `trace`)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Database connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// DuckDB database file, or `:memory:`
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_changeset() -> String {
    "changes".to_string()
}

fn default_db_path() -> String {
    "tidemark.duckdb".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace", "off"];

impl Default for Config {
    fn default() -> Self {
        Self {
            changeset: default_changeset(),
            database: DatabaseConfig::default(),
            resource_paths: Vec::new(),
            dev_mode: false,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::ConfigParseError {
            message: format!("{}: {e}", path.display()),
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory.
    ///
    /// Looks for `tidemark.yml` or `tidemark.yaml`; falls back to defaults
    /// when neither exists.
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        match CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.exists())
        {
            Some(path) => Self::load(&path),
            None => {
                log::debug!("No config file in {}, using defaults", dir.display());
                Ok(Self::default())
            }
        }
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.changeset.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "changeset path cannot be empty".to_string(),
            });
        }

        if self.database.path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database.path cannot be empty".to_string(),
            });
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "log_level '{}' is not one of {}",
                    self.log_level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }

        Ok(())
    }

    /// Changeset location resolved against `root`.
    pub fn changeset_path(&self, root: &Path) -> PathBuf {
        resolve(root, &self.changeset)
    }

    /// Resource directories resolved against `root`.
    pub fn resource_paths_absolute(&self, root: &Path) -> Vec<PathBuf> {
        self.resource_paths.iter().map(|p| resolve(root, p)).collect()
    }

    /// Database path resolved against `root`; `:memory:` is passed through.
    pub fn database_path(&self, root: &Path) -> String {
        if self.database.path == ":memory:" {
            return self.database.path.clone();
        }
        resolve(root, &self.database.path).display().to_string()
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

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
