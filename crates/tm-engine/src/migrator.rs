//! Top-level entry point: configure a changeset source, parse, execute.

use crate::engine::{Engine, RunSummary};
use crate::error::{EngineError, EngineResult};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use tm_core::{order_changes, Change, ChangeSetFormat, ChangeSetLoader, ChangeSetSource};
use tm_core::{ResourceDirs, ResourceLoader};
use tm_db::Connector;

/// Result of [`Migrator::execute`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Dev mode: nothing was parsed or executed.
    Skipped,
    /// The batch ran to completion and was committed.
    Completed(RunSummary),
}

/// Loads a changeset and hands it to the [`Engine`].
///
/// ```ignore
/// let mut migrator = Migrator::new().with_path("changes");
/// migrator.run(DuckDbConnector::new("app.duckdb")?)?;
/// ```
pub struct Migrator {
    source: Option<ChangeSetSource>,
    resources: Box<dyn ResourceLoader + Send + Sync>,
    dev_mode: bool,
    parsed: Option<Vec<Change>>,
}

impl Default for Migrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Migrator {
    pub fn new() -> Self {
        Self {
            source: None,
            resources: Box::new(ResourceDirs::default()),
            dev_mode: false,
            parsed: None,
        }
    }

    /// Read the changeset from `source`.
    pub fn with_source(mut self, source: ChangeSetSource) -> Self {
        self.source = Some(source);
        self.parsed = None;
        self
    }

    /// Read the changeset from a file or directory.
    pub fn with_path(self, path: impl Into<PathBuf>) -> Self {
        self.with_source(ChangeSetSource::path(path))
    }

    /// Read the changeset from `content` in `format`.
    pub fn with_text(self, content: impl Into<String>, format: ChangeSetFormat) -> Self {
        self.with_source(ChangeSetSource::Text {
            content: content.into(),
            format,
        })
    }

    /// Drain `reader` as the changeset.
    pub fn with_reader(self, reader: impl Read, format: ChangeSetFormat) -> EngineResult<Self> {
        Ok(self.with_source(ChangeSetSource::from_reader(reader, format)?))
    }

    /// Resolve `classpath:` task references through `resources`.
    pub fn with_resources(mut self, resources: impl ResourceLoader + Send + Sync + 'static) -> Self {
        self.resources = Box::new(resources);
        self
    }

    /// In dev mode `parse` and `execute` do nothing.
    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    pub fn is_dev_mode(&self) -> bool {
        self.dev_mode
    }

    /// Changes from the last successful `parse`, in version order.
    pub fn changes(&self) -> Option<&[Change]> {
        self.parsed.as_deref()
    }

    /// Load, resolve, and order the changeset without touching a database.
    ///
    /// Every file and `classpath:` reference is resolved here, so a missing
    /// script surfaces before any statement runs.
    pub fn parse(&mut self) -> EngineResult<&[Change]> {
        if self.dev_mode {
            log::info!("Dev mode: skipping changeset parse");
            return Ok(self.parsed.insert(Vec::new()).as_slice());
        }
        let source = self.source.as_ref().ok_or(EngineError::MissingSource)?;
        let changes = ChangeSetLoader::new(&*self.resources).load(source)?;
        let ordered = order_changes(changes)?;
        log::info!("Parsed {} change(s)", ordered.len());
        Ok(self.parsed.insert(ordered).as_slice())
    }

    /// Apply the parsed changes through `conn`.
    ///
    /// Takes ownership of the connector; it is closed on every path except
    /// dev mode, where it is dropped unused.
    pub fn execute<C: Connector>(&mut self, mut conn: C) -> EngineResult<RunOutcome> {
        if self.dev_mode {
            log::info!("Dev mode: skipping execution");
            return Ok(RunOutcome::Skipped);
        }
        let Some(changes) = self.parsed.take() else {
            if let Err(e) = conn.close() {
                log::warn!("Closing {} connection failed: {e}", conn.db_type());
            }
            return Err(EngineError::NotParsed);
        };
        Engine::new(conn).run(changes).map(RunOutcome::Completed)
    }

    /// `parse` followed by `execute`. A parse failure closes `conn` unused.
    pub fn run<C: Connector>(&mut self, mut conn: C) -> EngineResult<RunOutcome> {
        if let Err(err) = self.parse() {
            if let Err(e) = conn.close() {
                log::warn!("Closing {} connection failed: {e}", conn.db_type());
            }
            return Err(err);
        }
        self.execute(conn)
    }
}

#[cfg(test)]
#[path = "migrator_test.rs"]
mod tests;
