//! Manifest patch writer
//!
//! Rewrites manifest text line by line, touching only the fields that
//! changed. Everything else — indentation, comments, blank lines, line
//! endings — passes through byte for byte.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::config::Origins;
use crate::error::{RelockError, RelockResult};
use crate::models::{Coordinate, Record, KEY_COORDINATE, KEY_DIGEST, KEY_ORIGIN};
use crate::parser::{is_record_close, is_record_open, split_assignment};
use crate::reconcile::Replacement;

/// Apply a replacement set to manifest text.
///
/// Each line gets the first occurrence of every old digest substituted
/// with its new digest. With `enable` set, a line containing a new digest
/// after its first `#` also loses that `#`, re-activating a previously
/// disabled field. An empty replacement set reproduces the input exactly.
pub fn apply_replacements(text: &str, replacements: &[Replacement], enable: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in text.split_inclusive('\n') {
        let mut line = segment.to_string();
        for replacement in replacements {
            line = line.replacen(&replacement.old_digest, &replacement.new_digest, 1);
            if enable {
                if let Some(enabled) = uncomment(&line, &replacement.new_digest) {
                    line = enabled;
                }
            }
        }
        out.push_str(&line);
    }
    out
}

/// Strip the first `#` from a line whose commented-out remainder contains
/// `needle` with at least one character on either side.
fn uncomment(line: &str, needle: &str) -> Option<String> {
    let hash = line.find('#')?;
    let after = &line[hash + 1..];
    let pos = after.find(needle)?;
    if pos == 0 || pos + needle.len() >= after.len() {
        return None;
    }
    Some(format!("{}{}", &line[..hash], after))
}

/// Result of a record-update pass.
#[derive(Debug)]
pub struct PatchOutcome {
    pub text: String,
    /// Names of records whose version actually changed in the text.
    pub updated: Vec<String>,
}

/// Rewrite the fields of records selected for update.
///
/// Re-runs the record scanner over the raw lines, keeping a side table of
/// variable declarations and their line numbers so a version held in a
/// variable can be rewritten at its declaration site. Records are matched
/// by name, so a block's `name` field must precede the fields to rewrite
/// (which is where the manifest format puts it).
pub fn apply_updates(text: &str, updates: &[Record], origins: &Origins) -> PatchOutcome {
    let mut lines: Vec<String> = text.split_inclusive('\n').map(String::from).collect();
    let by_name: HashMap<&str, &Record> = updates
        .iter()
        .filter_map(|record| record.name.as_deref().map(|name| (name, record)))
        .collect();

    let mut env: HashMap<String, String> = HashMap::new();
    let mut env_line: HashMap<String, usize> = HashMap::new();
    let mut current: Option<Record> = None;
    let mut updated: Vec<String> = Vec::new();

    for i in 0..lines.len() {
        let original = lines[i].clone();
        let line = original.trim();

        if is_record_open(line) {
            current = Some(Record::new());
            continue;
        }
        if current.is_some() && is_record_close(line) {
            current = None;
            continue;
        }
        let Some((key, value)) = split_assignment(line) else {
            continue;
        };

        let Some(record) = current.as_mut() else {
            env_line.insert(key.clone(), i);
            env.insert(key, value);
            continue;
        };
        record.set_field(&key, &value);

        let Some(name) = record.name.clone() else {
            continue;
        };
        let Some(new_record) = by_name.get(name.as_str()) else {
            continue;
        };

        if key == KEY_COORDINATE && references_variable(&value) {
            // The version lives in a variable; rewrite its declaration
            // line instead of this field.
            let Some(variable) = value.split('+').nth(1).map(str::trim) else {
                continue;
            };
            let Some(version) = new_version(new_record) else {
                continue;
            };
            if let (Some(&decl), Some(current_value)) =
                (env_line.get(variable), env.get(variable))
            {
                if current_value != version {
                    let decl_line = lines[decl].clone();
                    let (content, eol) = split_eol(&decl_line);
                    let indent = leading_whitespace(content);
                    lines[decl] = format!("{indent}{variable} = \"{version}\"{eol}");
                    mark_updated(&mut updated, &name);
                }
            }
            continue;
        }

        let Some(new_value) = new_record.field(&key) else {
            continue;
        };
        if value == new_value {
            continue;
        }

        let (content, eol) = split_eol(&original);
        let indent = leading_whitespace(content);

        if key == KEY_DIGEST && new_record.is_prerelease() {
            // Pre-release digests go in disabled, to be re-enabled once
            // the release build exists.
            lines[i] = format!("{indent}#{key} = \"{new_value}\",{eol}");
        } else if key == KEY_ORIGIN {
            let normalized = match origins.declared_name(new_value) {
                Some(declared) => declared.to_string(),
                None => new_value.replace(':', ""),
            };
            lines[i] = format!("{indent}{key} = {normalized},{eol}");
        } else {
            lines[i] = format!("{indent}{key} = \"{new_value}\",{eol}");
            if key == KEY_COORDINATE {
                mark_updated(&mut updated, &name);
            }
        }
    }

    PatchOutcome {
        text: lines.concat(),
        updated,
    }
}

/// A coordinate value still carrying a `+` concatenation after its group
/// and artifact components references a version variable.
fn references_variable(value: &str) -> bool {
    value
        .find(':')
        .map(|i| value[i..].contains('+'))
        .unwrap_or(false)
}

fn new_version(record: &Record) -> Option<&str> {
    record
        .coordinate
        .as_deref()
        .and_then(Coordinate::split)
        .map(|c| c.version)
}

fn mark_updated(updated: &mut Vec<String>, name: &str) {
    if !updated.iter().any(|n| n == name) {
        updated.push(name.to_string());
    }
}

fn split_eol(line: &str) -> (&str, &str) {
    if let Some(stripped) = line.strip_suffix("\r\n") {
        (stripped, "\r\n")
    } else if let Some(stripped) = line.strip_suffix('\n') {
        (stripped, "\n")
    } else {
        (line, "")
    }
}

fn leading_whitespace(content: &str) -> &str {
    &content[..content.len() - content.trim_start().len()]
}

/// Write patched text back to the manifest, all or nothing.
///
/// The text lands in a temp file in the manifest's directory first and is
/// renamed over the original, so an I/O failure leaves the manifest
/// untouched.
pub fn write_manifest(path: &Path, text: &str) -> RelockResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.persist(path).map_err(|e| RelockError::Io(e.error))?;
    Ok(())
}
