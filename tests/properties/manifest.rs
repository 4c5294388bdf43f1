//! Property tests for manifest parsing, patching, and resolution.

use proptest::prelude::*;

use relock::{apply_replacements, parse_manifest, Environment, Origins};

fn record_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{2,12}"
}

fn digest() -> impl Strategy<Value = String> {
    "[0-9a-f]{40}"
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: A constructed manifest parses back into one record per
    /// block with its digest intact, and an empty replacement set leaves
    /// the text byte-identical.
    #[test]
    fn property_parse_then_empty_patch_round_trips(
        records in proptest::collection::vec((record_name(), digest()), 1..6),
    ) {
        let mut text = String::new();
        for (name, digest) in &records {
            text.push_str(&format!(
                "maven_jar(\n    name = \"{name}\",\n    artifact = \"com.example:{name}:1.0\",\n    sha1 = \"{digest}\",\n)\n\n"
            ));
        }

        let collection = parse_manifest(&text, "WORKSPACE", &Origins::builtin());
        prop_assert_eq!(collection.records.len(), records.len());
        for (record, (name, digest)) in collection.records.iter().zip(&records) {
            prop_assert_eq!(record.name.as_deref(), Some(name.as_str()));
            prop_assert_eq!(record.digest.as_deref(), Some(digest.as_str()));
        }

        let untouched = apply_replacements(&text, &[], true);
        prop_assert_eq!(untouched, text);
    }

    /// PROPERTY: Resolving an already-resolved environment is a no-op.
    ///
    /// Variable names are uppercase and values lowercase, so the
    /// generated inputs stay inside the well-behaved territory the
    /// substitution contract promises to handle.
    #[test]
    fn property_resolution_is_idempotent(
        entries in proptest::collection::vec(("[A-Z][A-Z_]{2,8}", "[a-z0-9.]{1,12}"), 0..6),
    ) {
        let mut env = Environment::new();
        for (name, value) in &entries {
            env.insert(name.clone(), value.clone());
        }

        let origins = Origins::builtin();
        let once = env.resolve(&origins);
        let twice = once.resolve(&origins);
        prop_assert_eq!(once, twice);
    }
}
