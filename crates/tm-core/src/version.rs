//! Dotted version identifiers and their total order.
//!
//! A version such as `1.0.7.2` is compared segment by segment, most
//! significant first. Missing trailing segments count as zero, so `1.0` and
//! `1.0.0` produce equal keys while `1.10` still sorts after `1.9` and before
//! `2`.

use crate::error::{CoreError, CoreResult};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Comparison key derived from a dotted numeric version string.
#[derive(Debug, Clone)]
pub struct VersionKey {
    segments: Vec<u64>,
}

impl VersionKey {
    /// Parse a dotted identifier into a key.
    ///
    /// Every segment must be a non-empty run of ASCII digits that fits in a
    /// `u64`; anything else is a [`CoreError::MalformedVersion`].
    pub fn parse(version: &str) -> CoreResult<Self> {
        if version.is_empty() {
            return Err(malformed(version, "version is empty"));
        }

        let segments = version
            .split('.')
            .enumerate()
            .map(|(i, segment)| parse_segment(version, i, segment))
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(Self { segments })
    }

    fn segment(&self, idx: usize) -> u64 {
        self.segments.get(idx).copied().unwrap_or(0)
    }
}

fn parse_segment(version: &str, idx: usize, segment: &str) -> CoreResult<u64> {
    if segment.is_empty() {
        return Err(malformed(version, &format!("segment {} is empty", idx + 1)));
    }
    if !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(
            version,
            &format!("segment '{segment}' is not a non-negative integer"),
        ));
    }
    segment
        .parse::<u64>()
        .map_err(|e| malformed(version, &format!("segment '{segment}': {e}")))
}

fn malformed(version: &str, reason: &str) -> CoreError {
    CoreError::MalformedVersion {
        version: version.to_string(),
        reason: reason.to_string(),
    }
}

impl Ord for VersionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        (0..len)
            .map(|i| self.segment(i).cmp(&other.segment(i)))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for VersionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionKey {}

impl FromStr for VersionKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Return true when `name` looks like a dotted version (`1`, `1.0`, `1.0.7.2`).
///
/// Used when scanning directories, where non-version entries are skipped
/// rather than rejected.
pub fn is_version_like(name: &str) -> bool {
    VersionKey::parse(name).is_ok()
}

#[cfg(test)]
#[path = "version_test.rs"]
mod tests;
