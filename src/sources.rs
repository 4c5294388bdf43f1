//! Reference artifact sources
//!
//! Builds collections from the places reference digests live: a directory
//! of artifacts on disk, a remote repository reached through a downloader
//! command, or the origins named by the manifest records themselves.
//! (Another manifest file also works as a store; that path goes straight
//! through the parser.)
//!
//! Everything here is collaborator plumbing around the reconciliation
//! core: blocking subprocess calls, sequential per record, no shared
//! state.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;

use regex::Regex;
use sha1::{Digest, Sha1};
use tempfile::NamedTempFile;

use crate::collection::Collection;
use crate::config::{Origins, Verbosity};
use crate::error::{RelockError, RelockResult};
use crate::models::{Coordinate, OriginKind, Record};
use crate::parser::split_pair;

/// Expected-digest value passed to the downloader. Deliberately never a
/// real digest: the lookup must fail its verification so the tool's
/// failure output reports the digest it actually received.
const BOGUS_DIGEST: &str = "xxxxxxxxxxx";

/// Origin used when a record names none.
const FALLBACK_ORIGIN: &str = "MAVEN_CENTRAL:";

/// Resolves a coordinate against an origin to the digest currently
/// published there. `Ok(None)` means the artifact was not found; `Err`
/// means the collaborator itself failed.
pub trait DigestLookup {
    fn digest_for(&self, origin: &str, coordinate: &Coordinate) -> RelockResult<Option<String>>;
}

/// Digest lookup that shells out to a downloader command.
///
/// The command is invoked as `<downloader> -o <tmp> -u <url> -v <digest>`
/// with a deliberately wrong digest. On verification failure its output
/// contains an `expected ...` / `received ...` pair; the received value is
/// the published digest. No `received` line means not found. The download
/// target is a temp file scoped to the lookup and removed on every exit
/// path.
pub struct DownloadTool {
    command: String,
    verbosity: Verbosity,
}

impl DownloadTool {
    pub fn new(command: impl Into<String>, verbosity: Verbosity) -> Self {
        Self {
            command: command.into(),
            verbosity,
        }
    }

    fn url(origin: &str, coordinate: &Coordinate, jar_name: &str) -> String {
        [
            origin,
            &coordinate.group.replace('.', "/"),
            coordinate.artifact,
            coordinate.version,
            jar_name,
        ]
        .join("/")
    }
}

impl DigestLookup for DownloadTool {
    fn digest_for(&self, origin: &str, coordinate: &Coordinate) -> RelockResult<Option<String>> {
        let jar_name = format!("{}-{}.jar", coordinate.artifact, coordinate.version);
        let url = Self::url(origin, coordinate, &jar_name);

        // Dropped on all exit paths, which removes the file.
        let target = NamedTempFile::new()?;
        let target_path = target.path().to_string_lossy().to_string();

        if self.verbosity.verbose() {
            println!("Checking {origin} for {jar_name}...");
        }

        let output = Command::new(&self.command)
            .args(["-o", &target_path, "-u", &url, "-v", BOGUS_DIGEST])
            .output()
            .map_err(|e| RelockError::LookupFailed {
                coordinate: coordinate.with_version(coordinate.version),
                message: format!("{}: {e}", self.command),
            })?;

        if output.status.success() {
            // Cannot happen with a bogus expected digest; treat as not
            // found rather than trusting a digest we never saw.
            return Ok(None);
        }

        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        for line in combined.lines() {
            if let Some(rest) = line.trim().strip_prefix("received ") {
                let digest = rest.split_whitespace().next().unwrap_or("").to_string();
                if !digest.is_empty() {
                    if self.verbosity.verbose() {
                        println!("\tFound: {digest}");
                    }
                    return Ok(Some(digest));
                }
            }
        }

        if self.verbosity.verbose() {
            println!("\tNot found");
        }
        Ok(None)
    }
}

/// Re-resolve one record's digest against an origin.
///
/// Returns a copy of the record; the digest is replaced only when the
/// lookup finds the artifact, so a not-found leaves the old digest in
/// place and the later diff becomes a no-op for it.
pub fn refreshed_record(
    record: &Record,
    origin: Option<&str>,
    lookup: &dyn DigestLookup,
) -> RelockResult<Record> {
    let mut refreshed = record.clone();
    let Some(coordinate) = record.coordinate.as_deref().and_then(Coordinate::split) else {
        return Ok(refreshed);
    };

    let origin = match origin {
        Some(o) if !o.is_empty() => o,
        _ => FALLBACK_ORIGIN,
    };

    if let Some(digest) = lookup.digest_for(origin, &coordinate)? {
        refreshed.digest = Some(digest);
    }
    Ok(refreshed)
}

/// A collection built from a collaborator, plus the per-item failures
/// encountered along the way. Failures never abort the run; they feed the
/// exit status.
#[derive(Debug)]
pub struct FetchReport {
    pub collection: Collection,
    pub failures: Vec<String>,
}

/// Build a collection by looking every reference record up in one named
/// repository. The name may be a literal prefix (ends with `:`) or a
/// declared alias; anything else is a configuration error.
pub fn from_repository(
    name: &str,
    reference: &[Record],
    origins: &Origins,
    lookup: &dyn DigestLookup,
) -> RelockResult<FetchReport> {
    let resolved = if name.ends_with(':') {
        name.to_string()
    } else {
        origins
            .canonical(name)
            .ok_or_else(|| RelockError::UnknownOrigin {
                name: name.to_string(),
            })?
            .to_string()
    };

    let mut collection = Collection::new(OriginKind::Repository, resolved.clone());
    let mut failures = Vec::new();
    for record in reference {
        match refreshed_record(record, Some(&resolved), lookup) {
            Ok(refreshed) => collection.records.push(refreshed),
            Err(e) => {
                failures.push(e.to_string());
                collection.records.push(record.clone());
            }
        }
    }
    Ok(FetchReport {
        collection,
        failures,
    })
}

/// Build a collection by looking each reference record up in the origin
/// it names itself. Records naming no origin are skipped.
pub fn from_record_origins(
    reference: &[Record],
    lookup: &dyn DigestLookup,
    verbosity: Verbosity,
) -> FetchReport {
    let mut collection = Collection::new(OriginKind::Repository, "(origin from record)");
    let mut failures = Vec::new();
    for record in reference {
        let Some(origin) = record.origin.clone() else {
            if verbosity.verbose() {
                eprintln!(
                    "Record {} does not name an origin, skipping...",
                    record.display_name()
                );
            }
            continue;
        };
        match refreshed_record(record, Some(&origin), lookup) {
            Ok(refreshed) => collection.records.push(refreshed),
            Err(e) => {
                failures.push(e.to_string());
                collection.records.push(record.clone());
            }
        }
    }
    FetchReport {
        collection,
        failures,
    }
}

/// Build a collection by recursively scanning a directory for artifact
/// files and inspecting each one.
pub fn from_directory(root: &Path, file_matcher: &Regex) -> RelockResult<FetchReport> {
    let mut collection = Collection::new(OriginKind::Directory, root.display().to_string());
    let mut files = Vec::new();
    walk_files(root, &mut files)?;
    files.retain(|path| file_matcher.is_match(&path.to_string_lossy()));

    let mut failures = Vec::new();
    for path in files {
        match inspect_artifact(&path) {
            Ok(record) => collection.records.push(record),
            Err(e) => failures.push(format!("{}: {e}", path.display())),
        }
    }
    Ok(FetchReport {
        collection,
        failures,
    })
}

fn walk_files(current: &Path, files: &mut Vec<PathBuf>) -> RelockResult<()> {
    for entry in fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// Build a record by inspecting an artifact file on disk.
///
/// The digest always comes from hashing the file bytes. The coordinate is
/// best-effort: it needs a vendor id and a version recovered from the
/// embedded jar manifest, and stays absent when either is missing. The
/// name is the filename prefix before `-<version>`, else the full
/// filename.
pub fn inspect_artifact(path: &Path) -> RelockResult<Record> {
    let mut record = Record::new();
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    record.name = Some(filename.clone());
    record.digest = Some(sha1_file(path)?);

    if let Some((vendor, version)) = read_artifact_metadata(path) {
        let name = filename
            .split(&format!("-{version}"))
            .next()
            .unwrap_or(&filename)
            .to_string();
        if !name.is_empty() && !vendor.is_empty() {
            record.coordinate = Some(format!("{vendor}:{name}:{version}"));
            record.name = Some(name);
        }
    }

    Ok(record)
}

/// Pull (vendor id, version) out of an artifact's embedded manifest via
/// `unzip -p`. Best-effort: any failure, including a missing manifest,
/// yields `None`.
fn read_artifact_metadata(path: &Path) -> Option<(String, String)> {
    let output = Command::new("unzip")
        .args(["-p"])
        .arg(path)
        .arg("META-INF/MANIFEST.MF")
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let manifest = String::from_utf8_lossy(&output.stdout);
    let mut vendor = None;
    let mut version = None;
    let mut spec_version = None;

    for line in manifest.lines() {
        let Some((key, value)) = split_pair(line, ':') else {
            continue;
        };
        match key.as_str() {
            "Implementation-Vendor-Id" => vendor = Some(value),
            "Implementation-Version" => version = Some(value),
            "Specification-Version" => spec_version = Some(value),
            _ => {}
        }
    }

    let version = version.or(spec_version)?;
    Some((vendor?, version))
}

/// SHA-1 of a file's contents, streamed in chunks.
pub fn sha1_file(path: &Path) -> RelockResult<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buf = [0u8; 65536];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// In-memory lookup for tests: coordinate string -> digest.
#[cfg(test)]
pub struct MapLookup {
    pub digests: std::collections::BTreeMap<String, String>,
    pub fail_on: Option<String>,
}

#[cfg(test)]
impl MapLookup {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            digests: pairs
                .iter()
                .map(|(c, d)| (c.to_string(), d.to_string()))
                .collect(),
            fail_on: None,
        }
    }
}

#[cfg(test)]
impl DigestLookup for MapLookup {
    fn digest_for(&self, _origin: &str, coordinate: &Coordinate) -> RelockResult<Option<String>> {
        let key = coordinate.with_version(coordinate.version);
        if self.fail_on.as_deref() == Some(key.as_str()) {
            return Err(RelockError::LookupFailed {
                coordinate: key,
                message: "simulated failure".to_string(),
            });
        }
        Ok(self.digests.get(&key).cloned())
    }
}
