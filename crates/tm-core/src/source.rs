//! Task sources and their resolution to plain text.
//!
//! A task's statements come from one of two places: an inline script or a
//! file reference. File references are either filesystem paths or
//! `classpath:` references into a bundle of resources. [`TaskSource::resolve`]
//! is the only place that distinguishes them; everything downstream sees text.

use crate::error::{CoreError, CoreResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Prefix marking a file reference as a bundled resource. Matched
/// case-insensitively.
pub const CLASSPATH_PREFIX: &str = "classpath:";

/// Where a task's script text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSource {
    /// Script text written inline in the changeset.
    Script(String),
    /// A filesystem path or `classpath:` resource reference.
    File(String),
}

impl TaskSource {
    /// Resolve this source to its text.
    ///
    /// Relative filesystem paths are joined onto `base_dir` when one is given.
    /// Missing files and resources are reported as
    /// [`CoreError::FileNotFound`] / [`CoreError::ResourceNotFound`].
    pub fn resolve(
        &self,
        base_dir: Option<&Path>,
        resources: &dyn ResourceLoader,
    ) -> CoreResult<String> {
        match self {
            TaskSource::Script(text) => Ok(text.clone()),
            TaskSource::File(reference) => match strip_classpath(reference) {
                Some(resource) => resources.load(resource)?.ok_or_else(|| {
                    CoreError::ResourceNotFound {
                        path: reference.clone(),
                    }
                }),
                None => read_script_file(reference, base_dir),
            },
        }
    }
}

/// Return the resource path if `reference` carries the classpath prefix.
fn strip_classpath(reference: &str) -> Option<&str> {
    let prefix = reference.get(..CLASSPATH_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(CLASSPATH_PREFIX) {
        return None;
    }
    Some(reference[CLASSPATH_PREFIX.len()..].trim_start_matches('/'))
}

fn read_script_file(reference: &str, base_dir: Option<&Path>) -> CoreResult<String> {
    let path = Path::new(reference);
    let path = match base_dir {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    };

    if !path.is_file() {
        return Err(CoreError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    std::fs::read_to_string(&path).map_err(|source| CoreError::FileRead {
        path: path.display().to_string(),
        source,
    })
}

/// Lookup of bundled resources addressed by `classpath:` references.
pub trait ResourceLoader {
    /// Load the resource at `path`, or `Ok(None)` if the bundle has no such
    /// resource.
    fn load(&self, path: &str) -> CoreResult<Option<String>>;
}

/// Bundled resources backed by a list of directories, searched in order.
#[derive(Debug, Clone, Default)]
pub struct ResourceDirs {
    roots: Vec<PathBuf>,
}

impl ResourceDirs {
    /// Create a loader over `roots`.
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }
}

impl ResourceLoader for ResourceDirs {
    fn load(&self, path: &str) -> CoreResult<Option<String>> {
        for root in &self.roots {
            let candidate = root.join(path);
            if candidate.is_file() {
                log::debug!("Resolved resource {} to {}", path, candidate.display());
                return std::fs::read_to_string(&candidate)
                    .map(Some)
                    .map_err(|source| CoreError::FileRead {
                        path: candidate.display().to_string(),
                        source,
                    });
            }
        }
        Ok(None)
    }
}

impl ResourceLoader for HashMap<String, String> {
    fn load(&self, path: &str) -> CoreResult<Option<String>> {
        Ok(self.get(path).cloned())
    }
}

/// Bundled resources compiled into the binary with `rust-embed`.
///
/// ```ignore
/// #[derive(rust_embed::RustEmbed)]
/// #[folder = "migrations/"]
/// struct Migrations;
///
/// let resources = EmbeddedResources::<Migrations>::new();
/// ```
#[cfg(feature = "embed")]
pub struct EmbeddedResources<E> {
    _bundle: std::marker::PhantomData<E>,
}

#[cfg(feature = "embed")]
impl<E: rust_embed::RustEmbed> EmbeddedResources<E> {
    /// Create a loader over the embedded bundle `E`.
    pub fn new() -> Self {
        Self {
            _bundle: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "embed")]
impl<E: rust_embed::RustEmbed> Default for EmbeddedResources<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "embed")]
impl<E: rust_embed::RustEmbed> ResourceLoader for EmbeddedResources<E> {
    fn load(&self, path: &str) -> CoreResult<Option<String>> {
        let Some(file) = E::get(path) else {
            return Ok(None);
        };
        String::from_utf8(file.data.into_owned())
            .map(Some)
            .map_err(|e| CoreError::FileRead {
                path: format!("{CLASSPATH_PREFIX}{path}"),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            })
    }
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
