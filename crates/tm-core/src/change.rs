//! Versioned changes and batch ordering.

use crate::error::{CoreError, CoreResult};
use crate::task::Task;
use crate::version::VersionKey;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// A version-tagged, ordered collection of [`Task`]s.
///
/// Identity is the version string alone: two changes with the same version
/// are equal regardless of their tasks.
#[derive(Debug, Clone)]
pub struct Change {
    version: String,
    tasks: Vec<Task>,
}

impl Change {
    /// Create a change. Tasks are put in execution order: ascending `order`,
    /// ties kept in declaration order.
    pub fn new(version: impl Into<String>, mut tasks: Vec<Task>) -> Self {
        tasks.sort_by_key(Task::order);
        Self {
            version: version.into(),
            tasks,
        }
    }

    /// The version identifier as written.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Tasks in execution order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Parse the version into its comparison key.
    pub fn version_key(&self) -> CoreResult<VersionKey> {
        VersionKey::parse(&self.version)
    }

    /// Total number of statements across all tasks.
    pub fn statement_count(&self) -> usize {
        self.tasks.iter().map(|t| t.statements().len()).sum()
    }

    fn duplicate_task_name(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.tasks
            .iter()
            .map(Task::name)
            .find(|name| !seen.insert(*name))
    }
}

impl PartialEq for Change {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for Change {}

impl Hash for Change {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.version.hash(state);
    }
}

/// Validate a batch and return it in version order.
///
/// Fails with [`CoreError::MalformedVersion`] for unparsable versions,
/// [`CoreError::DuplicateVersion`] when two changes share a version string,
/// and [`CoreError::InvalidTask`] when a change repeats a task name. The sort
/// is stable, so keys that compare equal (`1.0` and `1.0.0`) keep their
/// declaration order.
pub fn order_changes(changes: Vec<Change>) -> CoreResult<Vec<Change>> {
    let mut seen = HashSet::new();
    let mut keyed = Vec::with_capacity(changes.len());

    for change in changes {
        let key = change.version_key()?;
        if !seen.insert(change.version.clone()) {
            return Err(CoreError::DuplicateVersion {
                version: change.version,
            });
        }
        if let Some(name) = change.duplicate_task_name() {
            return Err(CoreError::InvalidTask {
                version: change.version.clone(),
                task: name.to_string(),
                reason: "task name is declared more than once".to_string(),
            });
        }
        keyed.push((key, change));
    }

    keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(keyed.into_iter().map(|(_, change)| change).collect())
}

#[cfg(test)]
#[path = "change_test.rs"]
mod tests;
