//! Variable environment for manifest files
//!
//! Manifests declare top-level variables (version strings, repository
//! aliases) that record fields reference by name. This module resolves
//! those references.
//!
//! Resolution is plain substring substitution in declaration order. That is
//! the contract: it terminates and behaves predictably only when no variable
//! name is a substring of another and no cyclic reference exists. A token
//! model would be sturdier but would change observable output on such
//! inputs, so the substitution algorithm is kept exactly as-is.

use crate::config::Origins;

/// String-concatenation token joining a literal and a variable reference,
/// e.g. `"com.x:lib:" + VERSION`.
pub const CONCAT_TOKEN: &str = " + ";

/// Remove concatenation tokens so the remaining text is substitutable.
pub fn strip_concat(value: &str) -> String {
    value.replace(CONCAT_TOKEN, "")
}

/// Insertion-ordered mapping of symbolic name to string value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    entries: Vec<(String, String)>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a variable. Re-declaring keeps the original
    /// position, matching the file's first declaration order.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Resolve inter-variable references.
    ///
    /// Every value gets its concatenation tokens stripped, then every other
    /// declared name substituted wherever it occurs as a substring. All
    /// substitutions read the pre-resolution snapshot, so forward and
    /// backward references both resolve one level per pass. A raw value
    /// naming a well-known origin alias resolves to the alias's canonical
    /// literal instead. A reference to an unknown symbol is left verbatim;
    /// that is reportable, not an error.
    pub fn resolve(&self, origins: &Origins) -> Environment {
        let mut resolved = Vec::with_capacity(self.entries.len());
        for (name, raw) in &self.entries {
            let mut value = strip_concat(raw);
            for (other, other_value) in &self.entries {
                value = value.replace(other.as_str(), other_value.as_str());
            }
            if let Some(canonical) = origins.canonical(raw) {
                value = canonical.to_string();
            }
            resolved.push((name.clone(), value));
        }
        Environment { entries: resolved }
    }

    /// Substitute every declared name occurring in `value` as a substring.
    pub fn expand(&self, value: &str) -> String {
        let mut out = value.to_string();
        for (name, val) in &self.entries {
            out = out.replace(name.as_str(), val.as_str());
        }
        out
    }
}
