//! Error types for tm-core

use thiserror::Error;

/// Core error type for Tidemark
///
/// Everything in here is raised while loading or ordering changes, before a
/// database connection is touched.
#[derive(Error, Debug)]
pub enum CoreError {
    /// L001: Changeset source not found
    #[error("[L001] Changeset not found: {path}")]
    ChangeSetNotFound { path: String },

    /// L002: Changeset source could not be read
    #[error("[L002] Failed to read changeset {path}")]
    ChangeSetRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// L003: Changeset content is malformed
    #[error("[L003] Failed to parse changeset {path}: {message}")]
    ChangeSetParse { path: String, message: String },

    /// L004: Task definition is structurally invalid
    #[error("[L004] Invalid task '{task}' in change {version}: {reason}")]
    InvalidTask {
        version: String,
        task: String,
        reason: String,
    },

    /// V001: Version identifier cannot be decomposed into numeric segments
    #[error("[V001] Malformed version '{version}': {reason}")]
    MalformedVersion { version: String, reason: String },

    /// V002: Two changes in one batch share a version identifier
    #[error("[V002] Version number {version} detected twice")]
    DuplicateVersion { version: String },

    /// F001: Referenced script file does not exist
    #[error("[F001] Unable to find file {path}")]
    FileNotFound { path: String },

    /// F002: Referenced bundled resource does not exist
    #[error("[F002] Unable to find bundled resource {path}")]
    ResourceNotFound { path: String },

    /// F003: Referenced file exists but could not be read
    #[error("[F003] Failed to read file {path}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Failed to parse configuration file
    #[error("[C002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// C003: Invalid configuration value
    #[error("[C003] Invalid config: {message}")]
    ConfigInvalid { message: String },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl From<serde_yaml::Error> for CoreError {
    fn from(err: serde_yaml::Error) -> Self {
        CoreError::ConfigParseError {
            message: err.to_string(),
        }
    }
}
