//! tm-core - Core library for Tidemark
//!
//! This crate provides the change/task data model, version ordering,
//! statement decomposition, changeset loading, and project configuration
//! used by the execution engine and CLI. Nothing in here touches a database.

pub mod change;
pub mod changeset;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod source;
pub mod task;
pub mod version;

pub use change::{order_changes, Change};
pub use changeset::{ChangeSetFormat, ChangeSetLoader, ChangeSetSource};
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use fingerprint::fingerprint;
#[cfg(feature = "embed")]
pub use source::EmbeddedResources;
pub use source::{ResourceDirs, ResourceLoader, TaskSource};
pub use task::{split_statements, Task, DEFAULT_DELIMITER, UNSPECIFIED_ORDER};
pub use version::VersionKey;
