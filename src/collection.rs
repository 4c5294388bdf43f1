//! Record collections and validation
//!
//! A `Collection` is an ordered set of records plus the provenance they
//! were loaded from. Declaration order is preserved end to end so output
//! is deterministic.

use regex::Regex;

use crate::env::Environment;
use crate::error::{RelockError, RelockResult};
use crate::models::{OriginKind, Record};

/// Compile a record filter.
///
/// Filters match from the start of the coordinate (or name), so a pattern
/// like `com\.example` needs a leading `.*` to match mid-string — the same
/// convention the CLI documents.
pub fn compile_filter(pattern: &str) -> RelockResult<Regex> {
    Regex::new(&format!("^(?:{pattern})")).map_err(|e| RelockError::InvalidFilter {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Two distinct records sharing one digest.
///
/// Always surfaced, never auto-fixed: in practice it means a stale
/// copy-paste rather than a hash collision, and either way a human has to
/// look.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateDigest {
    pub first: String,
    pub second: String,
    pub digest: String,
}

/// Validation findings for one collection.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub origin: String,
    pub missing: Vec<String>,
    pub duplicates: Vec<DuplicateDigest>,
}

impl ValidationReport {
    /// Combined issue count; used as the process exit signal for a pure
    /// validation run.
    pub fn issues(&self) -> usize {
        self.missing.len() + self.duplicates.len()
    }
}

/// An ordered set of records plus provenance.
#[derive(Debug, Clone)]
pub struct Collection {
    pub origin_kind: OriginKind,
    pub origin: String,
    pub records: Vec<Record>,
    /// Resolved variable environment; only meaningful for manifest-origin
    /// collections.
    pub env: Option<Environment>,
}

impl Collection {
    pub fn new(origin_kind: OriginKind, origin: impl Into<String>) -> Self {
        Self {
            origin_kind,
            origin: origin.into(),
            records: Vec::new(),
            env: None,
        }
    }

    /// Destructively narrow the records to those whose coordinate (or,
    /// when absent, name) matches. Records with neither are dropped.
    pub fn retain_matching(&mut self, matcher: &Regex) {
        self.records.retain(|record| {
            record
                .coordinate
                .as_deref()
                .or(record.name.as_deref())
                .map(|subject| matcher.is_match(subject))
                .unwrap_or(false)
        });
    }

    /// Names of records with no primary digest.
    pub fn missing_digests(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|record| record.digest.is_none())
            .map(|record| record.display_name().to_string())
            .collect()
    }

    /// All unordered pairs of records with differing coordinates and
    /// identical, present primary digests.
    pub fn duplicate_digest_pairs(&self) -> Vec<DuplicateDigest> {
        let mut pairs = Vec::new();
        for (i, record) in self.records.iter().enumerate() {
            let Some(digest) = record.digest.as_deref() else {
                continue;
            };
            for other in &self.records[i + 1..] {
                if record.coordinate != other.coordinate && other.digest.as_deref() == Some(digest)
                {
                    pairs.push(DuplicateDigest {
                        first: record.display_name().to_string(),
                        second: other.display_name().to_string(),
                        digest: digest.to_string(),
                    });
                }
            }
        }
        pairs
    }

    /// Coordinates denoting pre-release builds.
    pub fn snapshot_coordinates(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|record| record.is_prerelease())
            .filter_map(|record| record.coordinate.clone())
            .collect()
    }

    /// Run both data checks and bundle the findings.
    pub fn validate(&self) -> ValidationReport {
        ValidationReport {
            origin: self.origin.clone(),
            missing: self.missing_digests(),
            duplicates: self.duplicate_digest_pairs(),
        }
    }
}
