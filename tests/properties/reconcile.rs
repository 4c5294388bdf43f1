//! Property tests for the reconciliation engine.

use proptest::prelude::*;

use relock::{diff, Collection, OriginKind, Record};

fn maybe_digest() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[0-9a-f]{8}")
}

fn record(coordinate: &str, digest: Option<String>) -> Record {
    Record {
        name: Some(coordinate.to_string()),
        coordinate: Some(coordinate.to_string()),
        digest,
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

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: For a matching coordinate, a replacement is emitted iff
    /// both digests are present and unequal, and it carries exactly the
    /// old and new values.
    #[test]
    fn property_replacement_iff_both_present_and_unequal(
        left in maybe_digest(),
        right in maybe_digest(),
    ) {
        let m = manifest(vec![record("com.x:lib:1.0", left.clone())]);
        let r = reference(vec![record("com.x:lib:1.0", right.clone())]);

        let replacements = diff(&m, &r).unwrap();
        match (&left, &right) {
            (Some(old), Some(new)) if old != new => {
                prop_assert_eq!(replacements.len(), 1);
                prop_assert_eq!(replacements[0].old_digest.as_str(), old.as_str());
                prop_assert_eq!(replacements[0].new_digest.as_str(), new.as_str());
            }
            _ => prop_assert!(replacements.is_empty()),
        }
    }

    /// PROPERTY: Unmatched coordinates never produce replacements, no
    /// matter the digests.
    #[test]
    fn property_no_replacement_without_coordinate_match(
        left in maybe_digest(),
        right in maybe_digest(),
    ) {
        let m = manifest(vec![record("com.x:one:1.0", left)]);
        let r = reference(vec![record("com.x:two:1.0", right)]);
        prop_assert!(diff(&m, &r).unwrap().is_empty());
    }

    /// PROPERTY: Duplicate detection is symmetric: reversing the record
    /// order reports the same unordered pairs.
    #[test]
    fn property_duplicate_pairs_symmetric(
        choices in proptest::collection::vec(0u8..3, 2..6),
    ) {
        let digests = ["aaaa", "bbbb", "cccc"];
        let records: Vec<Record> = choices
            .iter()
            .enumerate()
            .map(|(i, choice)| {
                record(
                    &format!("com.x:r{i}:1.0"),
                    Some(digests[*choice as usize].to_string()),
                )
            })
            .collect();

        let forward = manifest(records.clone());
        let mut reversed_records = records;
        reversed_records.reverse();
        let reversed = manifest(reversed_records);

        let normalize = |collection: &Collection| {
            let mut pairs: Vec<(String, String)> = collection
                .duplicate_digest_pairs()
                .into_iter()
                .map(|pair| {
                    let mut names = [pair.first, pair.second];
                    names.sort();
                    let [a, b] = names;
                    (a, b)
                })
                .collect();
            pairs.sort();
            pairs
        };

        prop_assert_eq!(normalize(&forward), normalize(&reversed));
    }
}
