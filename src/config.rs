//! Configuration for relock
//!
//! Settings come from an optional `.relock.toml` next to the manifest, with
//! CLI flags taking priority. Unknown keys are collected as non-fatal
//! warnings rather than rejected.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{RelockError, RelockResult};

/// Configuration file name, looked up in the manifest's directory.
pub const CONFIG_FILE: &str = ".relock.toml";

/// How much detail components print while working.
///
/// Passed explicitly into every component that logs; there is no global
/// verbosity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    #[default]
    Normal,
    Verbose,
    Debug,
}

impl Verbosity {
    /// Map a `-v` occurrence count onto a level.
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    }

    pub fn verbose(self) -> bool {
        self >= Verbosity::Verbose
    }

    pub fn debug(self) -> bool {
        self >= Verbosity::Debug
    }
}

/// Well-known origin aliases: declared name paired with the canonical
/// prefix literal the downloader understands.
///
/// Order is declaration order; config extras follow the builtins.
#[derive(Debug, Clone)]
pub struct Origins {
    entries: Vec<(String, String)>,
}

const BUILTIN_ORIGINS: &[(&str, &str)] = &[
    ("GERRIT", "GERRIT:"),
    ("GERRIT_API", "GERRIT_API:"),
    ("MAVEN_CENTRAL", "MAVEN_CENTRAL:"),
    ("MAVEN_LOCAL", "MAVEN_LOCAL:"),
    ("ECLIPSE", "ECLIPSE:"),
];

impl Origins {
    /// The builtin alias table alone.
    pub fn builtin() -> Self {
        Self::with_extras(&BTreeMap::new())
    }

    /// Builtins followed by configured extras. An extra sharing a builtin
    /// name overrides its canonical literal.
    pub fn with_extras(extras: &BTreeMap<String, String>) -> Self {
        let mut entries: Vec<(String, String)> = BUILTIN_ORIGINS
            .iter()
            .map(|(name, prefix)| (name.to_string(), prefix.to_string()))
            .collect();
        for (name, prefix) in extras {
            if let Some(entry) = entries.iter_mut().find(|(n, _)| n == name) {
                entry.1 = prefix.clone();
            } else {
                entries.push((name.clone(), prefix.clone()));
            }
        }
        Self { entries }
    }

    /// Canonical prefix for a declared alias name.
    pub fn canonical(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, prefix)| prefix.as_str())
    }

    /// Reverse lookup: declared name for a canonical prefix. Used by the
    /// patch writer to expand an abbreviated alias back into the name the
    /// manifest declares.
    pub fn declared_name(&self, prefix: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, p)| p == prefix)
            .map(|(name, _)| name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.canonical(name).is_some()
    }

    /// Declared names, for error messages and help text.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
}

/// Reference-store settings
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Downloader command used for repository digest lookups
    #[serde(default = "default_downloader")]
    pub downloader: String,

    /// Filename pattern selecting artifacts during a directory scan
    #[serde(default = "default_artifact_pattern")]
    pub artifact_pattern: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            downloader: default_downloader(),
            artifact_pattern: default_artifact_pattern(),
        }
    }
}

fn default_downloader() -> String {
    "tools/download_file.py".to_string()
}

fn default_artifact_pattern() -> String {
    ".+\\.jar$".to_string()
}

/// Version-bump settings
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BumpConfig {
    /// Artifact id whose version-table key omits the group prefix
    #[serde(default)]
    pub legacy_artifact: Option<String>,
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Manifest file to reconcile
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,

    /// Default record filter (a regular expression)
    #[serde(default = "default_filter")]
    pub filter: String,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub bump: BumpConfig,

    /// Extra origin aliases: declared name -> canonical prefix
    #[serde(default)]
    pub origins: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            filter: default_filter(),
            store: StoreConfig::default(),
            bump: BumpConfig::default(),
            origins: BTreeMap::new(),
        }
    }
}

fn default_manifest() -> PathBuf {
    PathBuf::from("WORKSPACE")
}

fn default_filter() -> String {
    ".*".to_string()
}

impl Config {
    /// Load configuration and collect non-fatal warnings for unknown keys.
    pub fn load(path: &Path) -> RelockResult<(Config, Vec<ConfigWarning>)> {
        let content = fs::read_to_string(path)?;

        let mut unknown_paths: Vec<String> = Vec::new();
        let deserializer = toml::de::Deserializer::new(&content);

        let config: Config = serde_ignored::deserialize(deserializer, |p| {
            unknown_paths.push(p.to_string());
        })
        .map_err(|e| RelockError::InvalidConfig {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let warnings = unknown_paths
            .into_iter()
            .map(|path_str| ConfigWarning {
                key: path_str,
                file: path.to_path_buf(),
            })
            .collect();

        Ok((config, warnings))
    }

    /// Load `.relock.toml` from a directory if present; defaults otherwise.
    ///
    /// A missing file is normal. A present-but-invalid file is a
    /// configuration error and aborts before any work.
    pub fn load_or_default(dir: &Path) -> RelockResult<(Config, Vec<ConfigWarning>)> {
        let path = dir.join(CONFIG_FILE);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok((Config::default(), Vec::new()))
        }
    }

    /// The effective alias table: builtins plus configured extras.
    pub fn origins(&self) -> Origins {
        Origins::with_extras(&self.origins)
    }
}
