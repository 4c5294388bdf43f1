//! Error types for relock
//!
//! Uses `thiserror` for library errors; the binary wraps these in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for relock operations
pub type RelockResult<T> = Result<T, RelockError>;

/// Main error type for relock operations
#[derive(Error, Debug)]
pub enum RelockError {
    /// Manifest file missing from the working directory
    #[error("manifest not found: {}", path.display())]
    ManifestNotFound { path: PathBuf },

    /// Filter expression failed to compile
    #[error("invalid filter expression '{pattern}': {message}")]
    InvalidFilter { pattern: String, message: String },

    /// Store name is neither a path, a literal prefix, nor a known alias
    #[error("unknown origin: {name}")]
    UnknownOrigin { name: String },

    /// Filter removed every record from the manifest
    #[error("no records matched filter '{pattern}' in {}", path.display())]
    EmptyFilterSet { pattern: String, path: PathBuf },

    /// Diffing requires a manifest-backed collection on the left-hand side
    #[error("replacement sets require a manifest collection, got {kind}")]
    DiffSourceNotManifest { kind: String },

    /// Digest lookup subprocess could not be run
    #[error("digest lookup failed for {coordinate}: {message}")]
    LookupFailed { coordinate: String, message: String },

    /// Configuration file is present but unreadable as TOML
    #[error("invalid configuration in {}: {message}", file.display())]
    InvalidConfig { file: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
