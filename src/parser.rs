//! Manifest parser
//!
//! Recovers dependency records and variable declarations from a Bazel-style
//! manifest. Records look like:
//!
//! ```text
//! maven_jar(
//!     name = "widget-core",
//!     artifact = "com.example:widget-core:" + WIDGET_VERS,
//!     repository = MAVEN_CENTRAL,
//!     sha1 = "b8f705851bf77393a403466ada224e9a53c13b95",
//!     #src_sha1 = "68f0ece9b1e56ac26f8ce31d9938c504f6951bca",
//! )
//! ```
//!
//! The scanner is deliberately tolerant: lines it does not understand are
//! ignored, a record that never closes is dropped, and commented-out fields
//! are still recovered so they stay visible to the model.

use std::fs;
use std::path::Path;

use crate::collection::Collection;
use crate::config::Origins;
use crate::env::{strip_concat, Environment};
use crate::error::RelockResult;
use crate::models::{OriginKind, Record};

/// Prefix opening a record block
pub const RECORD_OPEN: &str = "maven_jar(";
/// Line closing a record block
pub const RECORD_CLOSE: &str = ")";
/// Marker disabling a declaration or field
pub const COMMENT: char = '#';

/// Scanner state. The in-progress record is owned by the state and
/// finalized by move into the collection when its block closes.
enum ScanState {
    Outside,
    Inside(Record),
}

/// Whether a line opens a record block.
pub fn is_record_open(line: &str) -> bool {
    line.trim_start().starts_with(RECORD_OPEN)
}

/// Whether a line closes a record block.
pub fn is_record_close(line: &str) -> bool {
    line.trim() == RECORD_CLOSE
}

/// Split a `key <delim> value` line into a cleaned pair.
///
/// The key is everything before the first delimiter with any comment
/// markers dropped; the value is everything up to the second delimiter,
/// truncated at an inline comment, with quotes and commas removed. Lines
/// without at least one non-whitespace character on each side yield
/// `None`.
pub(crate) fn split_pair(s: &str, delim: char) -> Option<(String, String)> {
    let mut parts = s.split(delim);
    let raw_key = parts.next()?;
    let raw_value = parts.next()?;

    let key: String = raw_key.replace(COMMENT, "").trim().to_string();
    let value: String = raw_value
        .split(COMMENT)
        .next()
        .unwrap_or("")
        .trim()
        .replace(['"', ','], "");

    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Split a manifest `key = value` line, seeing through a disabling `#`.
pub fn split_assignment(line: &str) -> Option<(String, String)> {
    split_pair(line, '=')
}

/// Parse manifest text into a manifest-origin collection.
///
/// After the scan, variable references are resolved and substituted into
/// every record's coordinate and origin fields; an origin that still names
/// a well-known alias is replaced with its canonical literal.
pub fn parse_manifest(text: &str, origin: impl Into<String>, origins: &Origins) -> Collection {
    let mut collection = Collection::new(OriginKind::Manifest, origin);
    let mut env = Environment::new();
    let mut state = ScanState::Outside;

    for raw_line in text.lines() {
        let line = raw_line.trim();

        if is_record_open(line) {
            // An open marker while already inside a record abandons the
            // unterminated one, same as an open marker at end of file.
            state = ScanState::Inside(Record::new());
        } else if matches!(state, ScanState::Inside(_)) && is_record_close(line) {
            if let ScanState::Inside(record) = std::mem::replace(&mut state, ScanState::Outside) {
                collection.records.push(record);
            }
        } else if let Some((key, value)) = split_assignment(line) {
            match &mut state {
                ScanState::Outside => env.insert(key, value),
                ScanState::Inside(record) => {
                    record.set_field(&key, &value);
                }
            }
        }
        // Anything else is unknown manifest syntax; ignore it.
    }

    let env = env.resolve(origins);
    for record in &mut collection.records {
        if let Some(coordinate) = record.coordinate.take() {
            record.coordinate = Some(env.expand(&strip_concat(&coordinate)));
        }
        if let Some(origin_field) = record.origin.take() {
            let expanded = env.expand(&origin_field);
            record.origin = Some(match origins.canonical(&expanded) {
                Some(canonical) => canonical.to_string(),
                None => expanded,
            });
        }
    }
    collection.env = Some(env);
    collection
}

/// Parse a manifest file from disk.
pub fn parse_manifest_file(path: &Path, origins: &Origins) -> RelockResult<Collection> {
    let text = fs::read_to_string(path)?;
    Ok(parse_manifest(&text, path.display().to_string(), origins))
}
