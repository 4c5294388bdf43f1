//! Core data models for relock
//!
//! Defines the fundamental data structures used throughout relock:
//! - `Record`: one dependency entry recovered from a manifest or store
//! - `Coordinate`: the three-part `group:artifact:version` identifier
//! - `OriginKind`: provenance of a record collection

use serde::Serialize;

/// Manifest field keys that map onto `Record` fields.
///
/// Anything else appearing inside a record block is irrelevant to
/// reconciliation and is ignored by the parser.
pub const KEY_NAME: &str = "name";
pub const KEY_COORDINATE: &str = "artifact";
pub const KEY_ORIGIN: &str = "repository";
pub const KEY_DIGEST: &str = "sha1";
pub const KEY_SRC_DIGEST: &str = "src_sha1";

/// Where a collection's records were loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginKind {
    /// A build manifest file (the only kind that can be rewritten)
    Manifest,
    /// A recursive scan of artifacts on disk
    Directory,
    /// A remote package repository
    Repository,
}

impl OriginKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OriginKind::Manifest => "manifest",
            OriginKind::Directory => "directory",
            OriginKind::Repository => "repository",
        }
    }
}

/// One dependency entry.
///
/// All fields are optional: a manifest block may omit any of them, and a
/// record inspected from a bare file on disk has only a name and a digest.
/// An absent digest is `None`, never a placeholder string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    /// Display identifier (block name, or filename for inspected artifacts)
    pub name: Option<String>,

    /// Three-part `group:artifact:version` string, possibly unresolved
    pub coordinate: Option<String>,

    /// Symbolic or literal repository reference
    pub origin: Option<String>,

    /// Primary content digest
    pub digest: Option<String>,

    /// Companion digest for the source archive
    pub src_digest: Option<String>,

    /// Version this record replaces (set only on update records)
    pub previous_version: Option<String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a manifest field by key.
    ///
    /// Returns false (and leaves the record untouched) for unknown keys,
    /// which tolerates manifest fields irrelevant to reconciliation.
    pub fn set_field(&mut self, key: &str, value: &str) -> bool {
        let slot = match key {
            KEY_NAME => &mut self.name,
            KEY_COORDINATE => &mut self.coordinate,
            KEY_ORIGIN => &mut self.origin,
            KEY_DIGEST => &mut self.digest,
            KEY_SRC_DIGEST => &mut self.src_digest,
            _ => return false,
        };
        *slot = Some(value.to_string());
        true
    }

    /// Read a field back by manifest key (used by the patch writer to
    /// compare old and new values for the same line).
    pub fn field(&self, key: &str) -> Option<&str> {
        let slot = match key {
            KEY_NAME => &self.name,
            KEY_COORDINATE => &self.coordinate,
            KEY_ORIGIN => &self.origin,
            KEY_DIGEST => &self.digest,
            KEY_SRC_DIGEST => &self.src_digest,
            _ => return None,
        };
        slot.as_deref()
    }

    /// Best identifier for reports: name, else coordinate, else a marker.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.coordinate.as_deref())
            .unwrap_or("<unnamed>")
    }

    /// Whether this record's coordinate denotes a pre-release build.
    pub fn is_prerelease(&self) -> bool {
        self.coordinate
            .as_deref()
            .map(is_prerelease)
            .unwrap_or(false)
    }
}

/// A coordinate split into its three components.
///
/// Borrowed views into the original string; a coordinate is well-formed
/// only when all three components are non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coordinate<'a> {
    pub group: &'a str,
    pub artifact: &'a str,
    pub version: &'a str,
}

impl<'a> Coordinate<'a> {
    /// Split `group:artifact:version`, rejecting anything that does not
    /// decompose into exactly three non-empty components.
    pub fn split(s: &'a str) -> Option<Self> {
        let mut parts = s.split(':');
        let group = parts.next()?;
        let artifact = parts.next()?;
        let version = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        if group.is_empty() || artifact.is_empty() || version.is_empty() {
            return None;
        }
        Some(Self {
            group,
            artifact,
            version,
        })
    }

    /// Rebuild the coordinate with a different version component.
    pub fn with_version(&self, version: &str) -> String {
        format!("{}:{}:{}", self.group, self.artifact, version)
    }
}

/// Case-insensitive pre-release marker check, usable on raw coordinates.
pub fn is_prerelease(coordinate: &str) -> bool {
    coordinate.to_ascii_lowercase().contains("-snapshot")
}
