//! Reconciliation engine
//!
//! Compares two record collections and computes what has to change in the
//! manifest: digest replacements when reconciling against a reference
//! store, or whole-record updates when reconciling against an
//! authoritative version table.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Serialize;

use crate::collection::Collection;
use crate::error::{RelockError, RelockResult};
use crate::models::{Coordinate, OriginKind, Record};
use crate::sources::{refreshed_record, DigestLookup};

/// One digest substitution: which coordinate, what it says now, what it
/// should say.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replacement {
    pub coordinate: String,
    pub old_digest: String,
    pub new_digest: String,
}

/// Diff a manifest collection against a reference collection.
///
/// A replacement is produced for every cross-collection pair of records
/// with equal coordinates whose digests are both present and unequal. An
/// absent digest on either side never produces a replacement.
///
/// When several reference records share one manifest coordinate, each
/// yields an independent replacement and they apply in order, so the last
/// one wins. Known limitation, kept for predictable output.
///
/// Only a manifest collection can be rewritten, so a non-manifest left
/// side is an error.
pub fn diff(manifest: &Collection, reference: &Collection) -> RelockResult<Vec<Replacement>> {
    if manifest.origin_kind != OriginKind::Manifest {
        return Err(RelockError::DiffSourceNotManifest {
            kind: manifest.origin_kind.as_str().to_string(),
        });
    }

    let mut replacements = Vec::new();
    for record in &manifest.records {
        let (Some(coordinate), Some(old)) = (record.coordinate.as_deref(), record.digest.as_deref())
        else {
            continue;
        };
        for other in &reference.records {
            if other.coordinate.as_deref() != Some(coordinate) {
                continue;
            }
            if let Some(new) = other.digest.as_deref() {
                if new != old {
                    replacements.push(Replacement {
                        coordinate: coordinate.to_string(),
                        old_digest: old.to_string(),
                        new_digest: new.to_string(),
                    });
                }
            }
        }
    }
    Ok(replacements)
}

/// Authoritative versions keyed by `<group>.<artifact>.version`.
///
/// One configured legacy artifact id may use the irregular key
/// `<artifact>.version` with no group prefix.
#[derive(Debug, Clone, Default)]
pub struct VersionTable {
    entries: BTreeMap<String, String>,
    legacy_artifact: Option<String>,
}

impl VersionTable {
    /// Parse a Java-properties-style listing, keeping only keys matching
    /// the filter. Comment lines and blanks are skipped; values keep
    /// embedded `=` characters and lose surrounding quotes.
    pub fn from_properties(
        text: &str,
        key_filter: &Regex,
        legacy_artifact: Option<String>,
    ) -> Self {
        let mut entries = BTreeMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, rest)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if !key_filter.is_match(key) {
                continue;
            }
            let value = rest.trim().trim_matches('"').to_string();
            entries.insert(key.to_string(), value);
        }
        Self {
            entries,
            legacy_artifact,
        }
    }

    pub fn from_properties_file(
        path: &Path,
        key_filter: &Regex,
        legacy_artifact: Option<String>,
    ) -> RelockResult<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::from_properties(&text, key_filter, legacy_artifact))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key_for(&self, coordinate: &Coordinate) -> String {
        if self.legacy_artifact.as_deref() == Some(coordinate.artifact) {
            format!("{}.version", coordinate.artifact)
        } else {
            format!("{}.{}.version", coordinate.group, coordinate.artifact)
        }
    }

    /// The authoritative version for a coordinate, if the table lists it.
    pub fn version_for(&self, coordinate: &Coordinate) -> Option<&str> {
        self.entries
            .get(&self.key_for(coordinate))
            .map(String::as_str)
    }
}

/// Outcome of classifying a manifest against a version table.
#[derive(Debug, Default)]
pub struct BumpPlan {
    /// Records to rewrite: coordinate carries the authoritative version,
    /// `previous_version` the one it replaces, digest re-resolved against
    /// the record's own origin.
    pub updates: Vec<Record>,
    /// Records whose version already matches the table.
    pub skipped: Vec<Record>,
    /// Coordinates whose key is not in the table (verbose-level noise).
    pub unlisted: Vec<String>,
    /// Per-record lookup failures; the affected records stay planned with
    /// their old digest.
    pub failures: Vec<String>,
}

/// Classify every manifest record against the table.
///
/// SKIP when the resolved version already equals the authoritative one,
/// UPDATE otherwise. Records without a well-formed coordinate are left
/// alone.
pub fn plan_updates(
    manifest: &Collection,
    table: &VersionTable,
    lookup: &dyn DigestLookup,
) -> BumpPlan {
    let mut plan = BumpPlan::default();

    for record in &manifest.records {
        let Some(coordinate) = record.coordinate.as_deref().and_then(Coordinate::split) else {
            continue;
        };

        let Some(authoritative) = table.version_for(&coordinate) else {
            plan.unlisted
                .push(coordinate.with_version(coordinate.version));
            continue;
        };

        if coordinate.version == authoritative {
            plan.skipped.push(record.clone());
            continue;
        }

        let mut update = record.clone();
        update.coordinate = Some(coordinate.with_version(authoritative));
        update.previous_version = Some(coordinate.version.to_string());

        let origin = update.origin.clone();
        match refreshed_record(&update, origin.as_deref(), lookup) {
            Ok(refreshed) => plan.updates.push(refreshed),
            Err(e) => {
                plan.failures.push(e.to_string());
                plan.updates.push(update);
            }
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OriginKind;
    use crate::sources::MapLookup;

    fn record(coordinate: Option<&str>, digest: Option<&str>) -> Record {
        Record {
            coordinate: coordinate.map(String::from),
            digest: digest.map(String::from),
            ..Record::default()
        }
    }

    fn manifest(records: Vec<Record>) -> Collection {
        Collection {
            records,
            ..Collection::new(OriginKind::Manifest, "WORKSPACE")
        }
    }

    fn reference(records: Vec<Record>) -> Collection {
        Collection {
            records,
            ..Collection::new(OriginKind::Repository, "MAVEN_CENTRAL:")
        }
    }

    #[test]
    fn test_diff_reports_changed_digest() {
        let left = manifest(vec![record(Some("com.x:lib:1.2.3"), Some("aaaa"))]);
        let right = reference(vec![record(Some("com.x:lib:1.2.3"), Some("bbbb"))]);

        let replacements = diff(&left, &right).unwrap();
        assert_eq!(
            replacements,
            vec![Replacement {
                coordinate: "com.x:lib:1.2.3".to_string(),
                old_digest: "aaaa".to_string(),
                new_digest: "bbbb".to_string(),
            }]
        );
    }

    #[test]
    fn test_diff_skips_equal_digests() {
        let left = manifest(vec![record(Some("com.x:lib:1.2.3"), Some("aaaa"))]);
        let right = reference(vec![record(Some("com.x:lib:1.2.3"), Some("aaaa"))]);
        assert!(diff(&left, &right).unwrap().is_empty());
    }

    #[test]
    fn test_diff_skips_absent_digests() {
        let left = manifest(vec![
            record(Some("com.x:a:1.0"), None),
            record(Some("com.x:b:1.0"), Some("aaaa")),
        ]);
        let right = reference(vec![
            record(Some("com.x:a:1.0"), Some("bbbb")),
            record(Some("com.x:b:1.0"), None),
        ]);
        assert!(diff(&left, &right).unwrap().is_empty());
    }

    #[test]
    fn test_diff_skips_unmatched_coordinates() {
        let left = manifest(vec![record(Some("com.x:a:1.0"), Some("aaaa"))]);
        let right = reference(vec![record(Some("com.x:b:1.0"), Some("bbbb"))]);
        assert!(diff(&left, &right).unwrap().is_empty());
    }

    #[test]
    fn test_diff_multiple_matches_yield_independent_tuples() {
        let left = manifest(vec![record(Some("com.x:a:1.0"), Some("aaaa"))]);
        let right = reference(vec![
            record(Some("com.x:a:1.0"), Some("bbbb")),
            record(Some("com.x:a:1.0"), Some("cccc")),
        ]);

        let replacements = diff(&left, &right).unwrap();
        assert_eq!(replacements.len(), 2);
        assert_eq!(replacements[0].new_digest, "bbbb");
        assert_eq!(replacements[1].new_digest, "cccc");
    }

    #[test]
    fn test_diff_requires_manifest_left_side() {
        let left = reference(vec![]);
        let right = reference(vec![]);
        let err = diff(&left, &right).unwrap_err();
        assert!(matches!(err, RelockError::DiffSourceNotManifest { .. }));
    }

    fn any_key() -> Regex {
        Regex::new(".*").unwrap()
    }

    #[test]
    fn test_version_table_parse_and_lookup() {
        let table = VersionTable::from_properties(
            "# release versions\n\
             com.x.widget.version = 2.0\n\
             com.x.gadget.version=\"3.1\"\n\
             \n\
             unrelated = value\n",
            &any_key(),
            None,
        );

        let widget = Coordinate::split("com.x:widget:1.0").unwrap();
        let gadget = Coordinate::split("com.x:gadget:1.0").unwrap();
        assert_eq!(table.version_for(&widget), Some("2.0"));
        assert_eq!(table.version_for(&gadget), Some("3.1"));
    }

    #[test]
    fn test_version_table_filters_keys() {
        let filter = Regex::new(".*com\\.x.*").unwrap();
        let table = VersionTable::from_properties(
            "com.x.widget.version = 2.0\norg.other.thing.version = 9.9\n",
            &filter,
            None,
        );
        let other = Coordinate::split("org.other:thing:1.0").unwrap();
        assert_eq!(table.version_for(&other), None);
    }

    #[test]
    fn test_version_table_legacy_artifact_key() {
        let table = VersionTable::from_properties(
            "core-runtime.version = 5.0\n",
            &any_key(),
            Some("core-runtime".to_string()),
        );
        // The legacy artifact resolves through the group-less key no
        // matter which group the manifest declares.
        let coordinate = Coordinate::split("com.anything:core-runtime:4.0").unwrap();
        assert_eq!(table.version_for(&coordinate), Some("5.0"));

        let regular = Coordinate::split("com.anything:other:4.0").unwrap();
        assert_eq!(table.version_for(&regular), None);
    }

    #[test]
    fn test_plan_updates_classification() {
        let collection = manifest(vec![
            record(Some("com.x:current:2.0"), Some("aaaa")),
            record(Some("com.x:stale:1.0"), Some("bbbb")),
            record(Some("com.x:unlisted:1.0"), Some("cccc")),
        ]);
        let table = VersionTable::from_properties(
            "com.x.current.version = 2.0\ncom.x.stale.version = 2.5\n",
            &any_key(),
            None,
        );
        let lookup = MapLookup::new(&[("com.x:stale:2.5", "dddd")]);

        let plan = plan_updates(&collection, &table, &lookup);

        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.unlisted, ["com.x:unlisted:1.0"]);
        assert_eq!(plan.updates.len(), 1);

        let update = &plan.updates[0];
        assert_eq!(update.coordinate.as_deref(), Some("com.x:stale:2.5"));
        assert_eq!(update.previous_version.as_deref(), Some("1.0"));
        assert_eq!(update.digest.as_deref(), Some("dddd"));
        assert!(plan.failures.is_empty());
    }

    #[test]
    fn test_plan_updates_lookup_failure_keeps_record_planned() {
        let collection = manifest(vec![record(Some("com.x:stale:1.0"), Some("bbbb"))]);
        let table =
            VersionTable::from_properties("com.x.stale.version = 2.5\n", &any_key(), None);
        let mut lookup = MapLookup::new(&[]);
        lookup.fail_on = Some("com.x:stale:2.5".to_string());

        let plan = plan_updates(&collection, &table, &lookup);
        assert_eq!(plan.failures.len(), 1);
        assert_eq!(plan.updates.len(), 1);
        // Old digest retained; the rewrite for it becomes a no-op.
        assert_eq!(plan.updates[0].digest.as_deref(), Some("bbbb"));
    }
}
