//! Changeset loading.
//!
//! Turns a changeset source into [`Change`]s with fully resolved task text.
//! Three layouts are understood:
//!
//! - a single `ChangeSet.json` / `ChangeSet.yml` / `ChangeSet.yaml` /
//!   `ChangeSet.xml` file (or any file with one of those extensions passed
//!   directly);
//! - a directory containing one of those files;
//! - a directory of version-named subdirectories (`1.0.0/`, `1.0.1/`), each
//!   holding its own changeset file or a set of `.sql` files that become
//!   file tasks.
//!
//! Every file and `classpath:` reference is read here, so a missing script
//! surfaces before any database work starts.

use crate::change::Change;
use crate::error::{CoreError, CoreResult};
use crate::source::{ResourceLoader, TaskSource};
use crate::task::Task;
use crate::version::is_version_like;
use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};

/// File names recognised as a changeset inside a directory, in lookup order.
pub const CHANGESET_FILE_NAMES: &[&str] = &[
    "ChangeSet.json",
    "ChangeSet.yml",
    "ChangeSet.yaml",
    "ChangeSet.xml",
];

const INLINE_SOURCE: &str = "<inline>";

const SHAPE_MESSAGE: &str = "expected a list of changes or a mapping with a 'changes' list";

/// Serialization format of a changeset document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSetFormat {
    Json,
    Yaml,
    Xml,
}

impl ChangeSetFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yml" | "yaml" => Some(Self::Yaml),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }

    /// Parse `content` into change records.
    ///
    /// The top-level node is inspected first so that a bare list and the
    /// `changes:` wrapper are each deserialized as their concrete shape and
    /// keep the parser's own error location.
    fn parse(self, content: &str) -> Result<Vec<ChangeRecord>, String> {
        match self {
            ChangeSetFormat::Json => json_records(content),
            ChangeSetFormat::Yaml => yaml_records(content),
            ChangeSetFormat::Xml => xml_records(content),
        }
    }
}

/// Where a changeset is read from.
#[derive(Debug, Clone)]
pub enum ChangeSetSource {
    /// Changeset document already in memory.
    Text {
        content: String,
        format: ChangeSetFormat,
    },
    /// A changeset file or a directory of changes.
    Path(PathBuf),
}

impl ChangeSetSource {
    /// Drain `reader` into an in-memory source.
    pub fn from_reader(mut reader: impl Read, format: ChangeSetFormat) -> CoreResult<Self> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|source| CoreError::ChangeSetRead {
                path: INLINE_SOURCE.to_string(),
                source,
            })?;
        Ok(Self::Text { content, format })
    }

    /// Source rooted at `path`.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }
}

/// `{ changes: [...] }` form of a changeset document.
#[derive(Debug, Deserialize)]
struct WrappedChanges {
    changes: Vec<ChangeRecord>,
}

/// A change as written in a changeset document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChangeRecord {
    pub version: String,

    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

/// A task as written in a changeset document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskRecord {
    #[serde(alias = "taskName")]
    pub name: String,

    /// A blank string or null counts as unspecified.
    #[serde(
        default,
        alias = "taskOrder",
        deserialize_with = "optional_order",
        skip_serializing_if = "Option::is_none"
    )]
    pub order: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    #[serde(default, alias = "filePath", skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
}

/// Parse a declared order written as text; blank means unspecified.
fn parse_order(text: &str) -> Result<Option<i64>, ParseIntError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse().map(Some)
}

fn optional_order<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderVisitor;

    impl<'de> Visitor<'de> for OrderVisitor {
        type Value = Option<i64>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an integer order, a blank string, or null")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            i64::try_from(v)
                .map(Some)
                .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            parse_order(v).map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(OrderVisitor)
}

/// YAML plain scalars such as `2` or `1.10` reach a `String` field as the
/// text written, so versions need no quoting.
fn yaml_records(content: &str) -> Result<Vec<ChangeRecord>, String> {
    let shape: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    match shape {
        serde_yaml::Value::Sequence(_) => serde_yaml::from_str::<Vec<ChangeRecord>>(content),
        serde_yaml::Value::Mapping(_) => {
            serde_yaml::from_str::<WrappedChanges>(content).map(|doc| doc.changes)
        }
        _ => return Err(SHAPE_MESSAGE.to_string()),
    }
    .map_err(|e| e.to_string())
}

/// JSON numbers lose their written text, so an integer version is taken as
/// its decimal form and a fractional one must be quoted.
fn json_records(content: &str) -> Result<Vec<ChangeRecord>, String> {
    use serde_json::Value;

    let changes = match serde_json::from_str::<Value>(content).map_err(|e| e.to_string())? {
        Value::Array(changes) => changes,
        Value::Object(mut doc) => match doc.remove("changes") {
            Some(Value::Array(changes)) => changes,
            _ => return Err(SHAPE_MESSAGE.to_string()),
        },
        _ => return Err(SHAPE_MESSAGE.to_string()),
    };

    changes
        .into_iter()
        .enumerate()
        .map(|(idx, mut change)| {
            let context = |message: &dyn fmt::Display| format!("change #{}: {message}", idx + 1);
            if let Some(version) = change.get_mut("version") {
                if let Value::Number(n) = version {
                    if !(n.is_u64() || n.is_i64()) {
                        return Err(context(&format!("version {n} must be written as a string")));
                    }
                    let text = n.to_string();
                    *version = Value::String(text);
                }
            }
            ChangeRecord::deserialize(change).map_err(|e| context(&e))
        })
        .collect()
}

/// `<ChangeSet><change>...</change></ChangeSet>`. The root element name is
/// not checked.
#[derive(Debug, Deserialize)]
struct XmlChangeSet {
    #[serde(default, rename = "change")]
    changes: Vec<XmlChange>,
}

#[derive(Debug, Deserialize)]
struct XmlChange {
    version: String,
    #[serde(default)]
    tasks: XmlTasks,
}

#[derive(Debug, Default, Deserialize)]
struct XmlTasks {
    #[serde(default, rename = "task")]
    tasks: Vec<XmlTask>,
}

/// Element text is untyped, so the order is parsed after the fact.
#[derive(Debug, Deserialize)]
struct XmlTask {
    #[serde(alias = "taskName")]
    name: String,
    #[serde(default, alias = "taskOrder")]
    order: Option<String>,
    #[serde(default)]
    script: Option<String>,
    #[serde(default, alias = "filePath")]
    file: Option<String>,
    #[serde(default)]
    delimiter: Option<String>,
}

fn xml_records(content: &str) -> Result<Vec<ChangeRecord>, String> {
    let document: XmlChangeSet = quick_xml::de::from_str(content).map_err(|e| e.to_string())?;
    document
        .changes
        .into_iter()
        .map(|change| -> Result<ChangeRecord, String> {
            let tasks = change
                .tasks
                .tasks
                .into_iter()
                .map(|task| -> Result<TaskRecord, String> {
                    let order = parse_order(task.order.as_deref().unwrap_or_default())
                        .map_err(|e| {
                            format!(
                                "change '{}', task '{}': invalid order: {e}",
                                change.version, task.name
                            )
                        })?;
                    Ok(TaskRecord {
                        name: task.name,
                        order,
                        script: task.script,
                        file: task.file,
                        delimiter: task.delimiter,
                    })
                })
                .collect::<Result<Vec<_>, String>>()?;
            Ok(ChangeRecord {
                version: change.version,
                tasks,
            })
        })
        .collect()
}

impl TaskRecord {
    /// The task's source; exactly one of `script` or `file` must be set.
    pub fn source(&self, version: &str) -> CoreResult<TaskSource> {
        let file = self.file.as_deref().filter(|f| !f.trim().is_empty());
        match (&self.script, file) {
            (Some(script), None) => Ok(TaskSource::Script(script.clone())),
            (None, Some(file)) => Ok(TaskSource::File(file.to_string())),
            (Some(_), Some(_)) => Err(self.invalid(version, "both 'script' and 'file' are set")),
            (None, None) => Err(self.invalid(version, "one of 'script' or 'file' is required")),
        }
    }

    fn invalid(&self, version: &str, reason: &str) -> CoreError {
        CoreError::InvalidTask {
            version: version.to_string(),
            task: self.name.clone(),
            reason: reason.to_string(),
        }
    }
}

impl ChangeRecord {
    /// Resolve every task source and build the [`Change`].
    pub fn into_change(
        self,
        base_dir: Option<&Path>,
        resources: &dyn ResourceLoader,
    ) -> CoreResult<Change> {
        let mut tasks = Vec::with_capacity(self.tasks.len());
        for record in &self.tasks {
            if record.name.trim().is_empty() {
                return Err(record.invalid(&self.version, "task name is empty"));
            }
            let text = record.source(&self.version)?.resolve(base_dir, resources)?;
            tasks.push(Task::new(
                record.name.clone(),
                record.order,
                &text,
                record.delimiter.as_deref(),
            ));
        }
        Ok(Change::new(self.version, tasks))
    }
}

/// Reads changesets and resolves their task sources.
pub struct ChangeSetLoader<'a> {
    resources: &'a dyn ResourceLoader,
}

impl<'a> ChangeSetLoader<'a> {
    /// Create a loader that resolves `classpath:` references through `resources`.
    pub fn new(resources: &'a dyn ResourceLoader) -> Self {
        Self { resources }
    }

    /// Load all changes from `source`, in declaration order.
    pub fn load(&self, source: &ChangeSetSource) -> CoreResult<Vec<Change>> {
        let changes = match source {
            ChangeSetSource::Text { content, format } => {
                self.from_text(content, *format, INLINE_SOURCE, None)?
            }
            ChangeSetSource::Path(path) => self.from_path(path)?,
        };
        log::debug!("Loaded {} change(s)", changes.len());
        Ok(changes)
    }

    fn from_path(&self, path: &Path) -> CoreResult<Vec<Change>> {
        if !path.exists() {
            return Err(CoreError::ChangeSetNotFound {
                path: path.display().to_string(),
            });
        }
        if path.is_dir() {
            self.from_directory(path)
        } else {
            self.from_file(path)
        }
    }

    fn from_file(&self, path: &Path) -> CoreResult<Vec<Change>> {
        let format = ChangeSetFormat::from_path(path).ok_or_else(|| CoreError::ChangeSetParse {
            path: path.display().to_string(),
            message: "unsupported changeset extension; expected .json, .yml, .yaml or .xml"
                .to_string(),
        })?;
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::ChangeSetRead {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("Reading changeset {}", path.display());
        self.from_text(&content, format, &path.display().to_string(), path.parent())
    }

    fn from_text(
        &self,
        content: &str,
        format: ChangeSetFormat,
        origin: &str,
        base_dir: Option<&Path>,
    ) -> CoreResult<Vec<Change>> {
        let records = format
            .parse(content)
            .map_err(|message| CoreError::ChangeSetParse {
                path: origin.to_string(),
                message,
            })?;

        records
            .into_iter()
            .map(|record| record.into_change(base_dir, self.resources))
            .collect()
    }

    fn from_directory(&self, dir: &Path) -> CoreResult<Vec<Change>> {
        if let Some(file) = find_changeset_file(dir) {
            return self.from_file(&file);
        }

        let mut changes = Vec::new();
        for version_dir in version_directories(dir)? {
            if let Some(file) = find_changeset_file(&version_dir) {
                changes.extend(self.from_file(&file)?);
                continue;
            }
            changes.push(self.from_task_files(&version_dir)?);
        }
        Ok(changes)
    }

    /// Build one change from the `.sql` files of a version directory.
    fn from_task_files(&self, version_dir: &Path) -> CoreResult<Change> {
        let version = file_name(version_dir);
        let mut files = list_entries(version_dir)?
            .into_iter()
            .filter(|p| p.is_file() && is_sql_file(p))
            .collect::<Vec<_>>();
        files.sort();

        let mut tasks = Vec::with_capacity(files.len());
        for file in files {
            let (order, name) = task_name_from_file(&file);
            let text = TaskSource::File(file.display().to_string()).resolve(None, self.resources)?;
            tasks.push(Task::new(name, order, &text, None));
        }
        Ok(Change::new(version, tasks))
    }
}

/// Return the first recognised changeset file directly inside `dir`.
pub fn find_changeset_file(dir: &Path) -> Option<PathBuf> {
    CHANGESET_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Split a task file name into `(order, name)`.
///
/// `"12 - Create table.sql"` yields `(Some(12), "Create table")`,
/// `"1.Add things.sql"` yields `(Some(1), "Add things")`, and a name without a
/// leading number keeps its whole stem with no order.
pub fn task_name_from_file(path: &Path) -> (Option<i64>, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let digits_end = stem
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(stem.len());
    let order = stem[..digits_end].parse::<i64>().ok();
    if order.is_none() {
        return (None, stem);
    }

    let name = stem[digits_end..]
        .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '-' | ':' | '.' | '_'))
        .trim_end();
    if name.is_empty() {
        (order, stem.clone())
    } else {
        (order, name.to_string())
    }
}

fn version_directories(dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let mut dirs = list_entries(dir)?
        .into_iter()
        .filter(|p| p.is_dir() && is_version_like(&file_name(p)))
        .collect::<Vec<_>>();
    dirs.sort();
    Ok(dirs)
}

fn list_entries(dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| CoreError::ChangeSetRead {
        path: dir.display().to_string(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| CoreError::ChangeSetRead {
            path: dir.display().to_string(),
            source,
        })?;
        if !file_name(&entry.path()).starts_with('.') {
            paths.push(entry.path());
        }
    }
    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_sql_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("sql"))
}

#[cfg(test)]
#[path = "changeset_test.rs"]
mod tests;
