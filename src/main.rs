//! relock CLI - digest reconciliation for build manifests
//!
//! Usage: relock [OPTIONS] <COMMAND>
//!
//! Commands:
//!   check      Validate manifest digests and report missing or duplicated ones
//!   snapshots  List records pinned to pre-release builds
//!   patch      Patch manifest digests from a reference store
//!   bump       Update record versions from an authoritative version table

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use regex::Regex;

use relock::collection::{Collection, ValidationReport};
use relock::config::{Config, Origins, Verbosity};
use relock::error::RelockError;
use relock::models::{Coordinate, Record};
use relock::reconcile::{diff, plan_updates, VersionTable};
use relock::sources::{self, DownloadTool, FetchReport};
use relock::{apply_replacements, apply_updates, compile_filter, parse_manifest_file};

mod cli;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let verbosity = Verbosity::from_count(cli.verbose);

    let (config, warnings) = Config::load_or_default(Path::new("."))?;
    for warning in &warnings {
        eprintln!(
            "warning: unknown configuration key '{}' in {}",
            warning.key,
            warning.file.display()
        );
    }

    let manifest_path = cli
        .manifest
        .clone()
        .unwrap_or_else(|| config.manifest.clone());
    if !manifest_path.is_file() {
        return Err(RelockError::ManifestNotFound {
            path: manifest_path,
        }
        .into());
    }

    let filter_pattern = cli.filter.clone().unwrap_or_else(|| config.filter.clone());
    let matcher = compile_filter(&filter_pattern)?;
    let origins = config.origins();

    let mut collection = parse_manifest_file(&manifest_path, &origins)?;
    collection.retain_matching(&matcher);
    if verbosity.debug() {
        print_contents_summary(&collection);
    }

    match cli.command {
        Commands::Check => cmd_check(&collection, cli.json),
        Commands::Snapshots => cmd_snapshots(&collection, cli.json),
        Commands::Patch {
            store,
            enable,
            dry_run,
        } => cmd_patch(
            &collection,
            &manifest_path,
            store,
            enable,
            dry_run,
            &config,
            &origins,
            &matcher,
            &filter_pattern,
            verbosity,
            cli.json,
        ),
        Commands::Bump { bom, check } => cmd_bump(
            &collection,
            &manifest_path,
            &bom,
            check,
            &config,
            &origins,
            &matcher,
            verbosity,
            cli.json,
        ),
        Commands::Parse => cmd_parse(&collection, cli.json),
    }
}

fn cmd_check(collection: &Collection, json: bool) -> Result<i32> {
    let report = collection.validate();

    if json {
        let output = serde_json::json!({
            "event": "check",
            "origin": &report.origin,
            "missing": &report.missing,
            "duplicates": report.duplicates.iter().map(|pair| {
                serde_json::json!({
                    "first": &pair.first,
                    "second": &pair.second,
                    "digest": &pair.digest,
                })
            }).collect::<Vec<_>>(),
            "issues": report.issues(),
        });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        print_validation(&report);
    }

    Ok(report.issues() as i32)
}

fn print_validation(report: &ValidationReport) {
    if report.missing.is_empty() {
        println!("All records in {} have digests.", report.origin);
    } else {
        println!("The following records in {} have no digest:", report.origin);
        for name in &report.missing {
            println!("  {name}");
        }
    }

    if report.duplicates.is_empty() {
        println!("No duplicate digests in {}.", report.origin);
    } else {
        println!("The following records in {} share a digest:", report.origin);
        for pair in &report.duplicates {
            println!("  {},{}: {}", pair.first, pair.second, pair.digest);
        }
    }
}

fn cmd_snapshots(collection: &Collection, json: bool) -> Result<i32> {
    let snapshots = collection.snapshot_coordinates();

    if json {
        let output = serde_json::json!({
            "event": "snapshots",
            "coordinates": &snapshots,
            "count": snapshots.len(),
        });
        println!("{}", serde_json::to_string(&output)?);
    } else if snapshots.is_empty() {
        println!("No pre-release records in {}.", collection.origin);
    } else {
        for coordinate in &snapshots {
            println!("{coordinate}");
        }
    }

    Ok(snapshots.len() as i32)
}

#[allow(clippy::too_many_arguments)]
fn cmd_patch(
    collection: &Collection,
    manifest_path: &Path,
    store: Option<String>,
    enable: bool,
    dry_run: bool,
    config: &Config,
    origins: &Origins,
    matcher: &Regex,
    filter_pattern: &str,
    verbosity: Verbosity,
    json: bool,
) -> Result<i32> {
    if collection.records.is_empty() {
        return Err(RelockError::EmptyFilterSet {
            pattern: filter_pattern.to_string(),
            path: manifest_path.to_path_buf(),
        }
        .into());
    }

    let lookup = DownloadTool::new(&config.store.downloader, verbosity);
    let file_matcher = compile_filter(&config.store.artifact_pattern)?;

    let report = build_store(
        store,
        collection,
        origins,
        &file_matcher,
        &lookup,
        verbosity,
    )?;
    let mut reference = report.collection;
    let mut failures = report.failures;
    reference.retain_matching(matcher);
    if verbosity.debug() {
        print_contents_summary(&reference);
    }

    let replacements = diff(collection, &reference)?;
    if verbosity.verbose() {
        for replacement in &replacements {
            println!(
                "Replacing {}: {} => {}",
                replacement.coordinate, replacement.old_digest, replacement.new_digest
            );
        }
    }

    let text = fs::read_to_string(manifest_path)?;
    let patched = apply_replacements(&text, &replacements, enable);
    let changed = patched != text;

    let mut written = false;
    if dry_run {
        if !json && changed {
            let text_diff = similar::TextDiff::from_lines(text.as_str(), patched.as_str());
            let mut unified = text_diff.unified_diff();
            unified.context_radius(3).header("current", "patched");
            print!("{unified}");
        }
    } else if changed {
        match relock::write_manifest(manifest_path, &patched) {
            Ok(()) => written = true,
            Err(e) => failures.push(format!("{}: {e}", manifest_path.display())),
        }
    }

    for failure in &failures {
        eprintln!("failed: {failure}");
    }

    if json {
        let output = serde_json::json!({
            "event": "patch",
            "manifest": manifest_path.display().to_string(),
            "store": &reference.origin,
            "replacements": &replacements,
            "dry_run": dry_run,
            "written": written,
            "failures": failures.len(),
        });
        println!("{}", serde_json::to_string(&output)?);
    } else if replacements.is_empty() {
        println!("All digests in {} match the store.", manifest_path.display());
    } else if dry_run {
        println!(
            "{} digest(s) would change in {}.",
            replacements.len(),
            manifest_path.display()
        );
    } else if written {
        println!(
            "Patched {} digest(s) in {}.",
            replacements.len(),
            manifest_path.display()
        );
    }

    Ok(failures.len() as i32)
}

/// Resolve the reference store the way the flag documents it: an existing
/// file is another manifest, an existing directory is scanned, anything
/// else is an origin name or prefix. No store means each record's own
/// origin.
fn build_store(
    store: Option<String>,
    collection: &Collection,
    origins: &Origins,
    file_matcher: &Regex,
    lookup: &DownloadTool,
    verbosity: Verbosity,
) -> Result<FetchReport> {
    let report = match store {
        None => sources::from_record_origins(&collection.records, lookup, verbosity),
        Some(name) => {
            let path = PathBuf::from(&name);
            if path.is_file() {
                FetchReport {
                    collection: parse_manifest_file(&path, origins)?,
                    failures: Vec::new(),
                }
            } else if path.is_dir() {
                sources::from_directory(&path, file_matcher)?
            } else {
                sources::from_repository(&name, &collection.records, origins, lookup)?
            }
        }
    };
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
fn cmd_bump(
    collection: &Collection,
    manifest_path: &Path,
    bom: &Path,
    check: bool,
    config: &Config,
    origins: &Origins,
    matcher: &Regex,
    verbosity: Verbosity,
    json: bool,
) -> Result<i32> {
    let table =
        VersionTable::from_properties_file(bom, matcher, config.bump.legacy_artifact.clone())?;
    let lookup = DownloadTool::new(&config.store.downloader, verbosity);

    let plan = plan_updates(collection, &table, &lookup);
    if verbosity.verbose() {
        for coordinate in &plan.unlisted {
            println!("Skipping {coordinate}: not listed in the version table.");
        }
    }
    for failure in &plan.failures {
        eprintln!("failed: {failure}");
    }

    if check {
        if json {
            let output = serde_json::json!({
                "event": "bump",
                "check": true,
                "updates": &plan.updates,
                "skipped": plan.skipped.len(),
                "failures": plan.failures.len(),
            });
            println!("{}", serde_json::to_string(&output)?);
        } else {
            print_bump_sections(&plan.updates, &[], &plan.skipped, true);
        }
        if !plan.updates.is_empty() {
            if !json {
                eprintln!("Check failed: out-of-date dependencies are present.");
            }
            return Ok(1);
        }
        return Ok(i32::from(!plan.failures.is_empty()));
    }

    let text = fs::read_to_string(manifest_path)?;
    let outcome = apply_updates(&text, &plan.updates, origins);

    let mut write_failed = false;
    if outcome.text != text {
        if let Err(e) = relock::write_manifest(manifest_path, &outcome.text) {
            eprintln!("failed: {}: {e}", manifest_path.display());
            write_failed = true;
        }
    }

    let applied = if write_failed {
        Vec::new()
    } else {
        outcome.updated
    };
    let (applied_records, not_updated): (Vec<Record>, Vec<Record>) =
        plan.updates.iter().cloned().partition(|record| {
            record
                .name
                .as_deref()
                .map(|name| applied.iter().any(|n| n == name))
                .unwrap_or(false)
        });

    if json {
        let output = serde_json::json!({
            "event": "bump",
            "check": false,
            "updates": &plan.updates,
            "applied": &applied,
            "skipped": plan.skipped.len(),
            "failures": plan.failures.len() + usize::from(write_failed),
        });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        print_bump_sections(&applied_records, &not_updated, &plan.skipped, false);
    }

    if !not_updated.is_empty() {
        if !json {
            eprintln!("Update failed: some records could not be updated.");
        }
        return Ok(1);
    }
    Ok(i32::from(!plan.failures.is_empty() || write_failed))
}

fn print_bump_sections(updated: &[Record], not_updated: &[Record], skipped: &[Record], check: bool) {
    if !updated.is_empty() {
        if check {
            println!("Records to update:");
        } else {
            println!("Updated records:");
        }
        for record in updated {
            println!("    {}", bump_line(record));
        }
    }

    if !not_updated.is_empty() {
        println!("Records not updated:");
        for record in not_updated {
            println!("    {}", bump_line(record));
        }
    }

    if !skipped.is_empty() {
        println!("Skipped records (already at the listed version):");
        for record in skipped {
            println!(
                "    {}",
                record
                    .coordinate
                    .as_deref()
                    .unwrap_or_else(|| record.display_name())
            );
        }
    }

    if updated.is_empty() && not_updated.is_empty() && skipped.is_empty() {
        println!("Nothing to do.");
    }
}

fn bump_line(record: &Record) -> String {
    match record.coordinate.as_deref().and_then(Coordinate::split) {
        Some(coordinate) => format!(
            "{}:{} {} -> {}",
            coordinate.group,
            coordinate.artifact,
            record.previous_version.as_deref().unwrap_or("?"),
            coordinate.version
        ),
        None => record.display_name().to_string(),
    }
}

fn cmd_parse(collection: &Collection, json: bool) -> Result<i32> {
    if json {
        for record in &collection.records {
            let output = serde_json::json!({
                "event": "record",
                "name": &record.name,
                "coordinate": &record.coordinate,
                "origin": &record.origin,
                "digest": &record.digest,
                "src_digest": &record.src_digest,
            });
            println!("{}", serde_json::to_string(&output)?);
        }
    } else {
        print_contents_summary(collection);
    }
    Ok(0)
}

fn print_contents_summary(collection: &Collection) {
    let hr = "-".repeat(80);
    println!("{hr}");
    println!(
        "Records under: {} ({})",
        collection.origin,
        collection.origin_kind.as_str()
    );
    if let Some(env) = &collection.env {
        if !env.is_empty() {
            println!("{hr}");
            println!("Environment:");
            for (name, value) in env.iter() {
                println!("{name}={value}");
            }
        }
    }
    println!("{hr}");
    for record in &collection.records {
        println!(
            "Found: {} {} ({})",
            record.display_name(),
            record.coordinate.as_deref().unwrap_or("-"),
            record.digest.as_deref().unwrap_or("-")
        );
    }
    println!("End: {}", collection.origin);
    println!("{hr}");
}
