//! Tasks and statement decomposition.

use crate::fingerprint::fingerprint;

/// Delimiter used when a task does not declare one.
pub const DEFAULT_DELIMITER: &str = ";";

/// Order assigned to tasks that do not declare one; sorts after every
/// explicit order.
pub const UNSPECIFIED_ORDER: i64 = i64::MAX;

/// A named, ordered unit of work inside a [`Change`](crate::Change).
///
/// Statements are derived once, at construction, from already-resolved
/// source text. A task never knows whether that text came from an inline
/// script, a file, or a bundled resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    name: String,
    order: i64,
    statements: Vec<String>,
}

impl Task {
    /// Build a task from resolved source text.
    ///
    /// `order: None` sorts last. `delimiter: None` or `Some("")` falls back to
    /// [`DEFAULT_DELIMITER`]. A whitespace-only delimiter such as `"\n"` is not
    /// blank: it is used as written.
    pub fn new(
        name: impl Into<String>,
        order: Option<i64>,
        text: &str,
        delimiter: Option<&str>,
    ) -> Self {
        Self {
            name: name.into(),
            order: order.unwrap_or(UNSPECIFIED_ORDER),
            statements: split_statements(text, delimiter),
        }
    }

    /// Task name; unique within its change.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sort order within the change.
    pub fn order(&self) -> i64 {
        self.order
    }

    /// Whether the order was declared rather than defaulted.
    pub fn has_explicit_order(&self) -> bool {
        self.order != UNSPECIFIED_ORDER
    }

    /// Trimmed statements in execution order.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Text the ledger fingerprints for this task.
    pub fn fingerprint_text(&self) -> String {
        self.statements.join("\n")
    }

    /// Ledger fingerprint of [`fingerprint_text`](Self::fingerprint_text).
    pub fn fingerprint(&self) -> i64 {
        fingerprint(&self.fingerprint_text())
    }
}

/// Resolve an optional per-task delimiter to the one actually used. Only an
/// empty string counts as unset.
pub fn effective_delimiter(delimiter: Option<&str>) -> &str {
    match delimiter {
        Some(d) if !d.is_empty() => d,
        _ => DEFAULT_DELIMITER,
    }
}

/// Split `text` on a literal delimiter and trim each piece.
///
/// Empty pieces (for example after a trailing `;`) are kept; the connector
/// decides what executing a blank statement means.
pub fn split_statements(text: &str, delimiter: Option<&str>) -> Vec<String> {
    text.split(effective_delimiter(delimiter))
        .map(|s| s.trim().to_string())
        .collect()
}

#[cfg(test)]
#[path = "task_test.rs"]
mod tests;
