//! relock - digest reconciliation for build manifests
//!
//! relock keeps the content digests declared in a Bazel-style build
//! manifest honest: it parses the manifest's dependency records, compares
//! them against a set of reference artifacts (another manifest, a
//! directory of packages, or a remote repository), and reports or patches
//! the mismatches in place without disturbing any other formatting.

pub mod collection;
pub mod config;
pub mod env;
pub mod error;
pub mod models;
pub mod parser;
pub mod patch;
pub mod reconcile;
pub mod sources;

// Re-exports for convenience
pub use collection::{compile_filter, Collection, DuplicateDigest, ValidationReport};
pub use config::{Config, ConfigWarning, Origins, Verbosity};
pub use env::Environment;
pub use error::{RelockError, RelockResult};
pub use models::{Coordinate, OriginKind, Record};
pub use parser::{parse_manifest, parse_manifest_file};
pub use patch::{apply_replacements, apply_updates, write_manifest, PatchOutcome};
pub use reconcile::{diff, plan_updates, BumpPlan, Replacement, VersionTable};
pub use sources::{DigestLookup, DownloadTool, FetchReport};
