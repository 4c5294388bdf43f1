use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// relock - digest reconciliation for build manifests
#[derive(Parser, Debug)]
#[command(name = "relock")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format for CI
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Manifest file to reconcile (default: WORKSPACE, or the configured path)
    #[arg(long, global = true)]
    pub manifest: Option<PathBuf>,

    /// Restrict records to those whose coordinate matches this regular
    /// expression (matched from the start; use `.*pattern.*` to match
    /// anywhere)
    #[arg(short, long, global = true)]
    pub filter: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate manifest digests and report missing or duplicated ones
    Check,

    /// List records pinned to pre-release builds
    Snapshots,

    /// Patch manifest digests from a reference store
    Patch {
        /// Reference store: a manifest file, a directory of artifacts, or
        /// an origin name/prefix. Defaults to each record's own origin.
        #[arg(short, long)]
        store: Option<String>,

        /// Also un-comment digests being patched
        #[arg(short, long)]
        enable: bool,

        /// Show the patch as a diff without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Update record versions from an authoritative version table
    Bump {
        /// Properties file listing authoritative versions
        #[arg(long)]
        bom: PathBuf,

        /// Report what would change without writing
        #[arg(long)]
        check: bool,
    },

    /// Parse and display manifest records (debugging)
    #[command(hide = true)]
    Parse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_check() {
        let cli = Cli::try_parse_from(["relock", "check"]).unwrap();
        assert!(matches!(cli.command, Commands::Check));
        assert!(!cli.json);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_cli_parse_snapshots() {
        let cli = Cli::try_parse_from(["relock", "snapshots"]).unwrap();
        assert!(matches!(cli.command, Commands::Snapshots));
    }

    #[test]
    fn test_cli_parse_patch_defaults() {
        let cli = Cli::try_parse_from(["relock", "patch"]).unwrap();
        if let Commands::Patch {
            store,
            enable,
            dry_run,
        } = cli.command
        {
            assert_eq!(store, None);
            assert!(!enable);
            assert!(!dry_run);
        } else {
            panic!("Expected Patch command");
        }
    }

    #[test]
    fn test_cli_parse_patch_with_args() {
        let cli = Cli::try_parse_from([
            "relock",
            "patch",
            "--store",
            "MAVEN_LOCAL",
            "--enable",
            "--dry-run",
        ])
        .unwrap();
        if let Commands::Patch {
            store,
            enable,
            dry_run,
        } = cli.command
        {
            assert_eq!(store.as_deref(), Some("MAVEN_LOCAL"));
            assert!(enable);
            assert!(dry_run);
        } else {
            panic!("Expected Patch command");
        }
    }

    #[test]
    fn test_cli_parse_bump() {
        let cli = Cli::try_parse_from(["relock", "bump", "--bom", "versions.properties"]).unwrap();
        if let Commands::Bump { bom, check } = cli.command {
            assert_eq!(bom, PathBuf::from("versions.properties"));
            assert!(!check);
        } else {
            panic!("Expected Bump command");
        }
    }

    #[test]
    fn test_cli_parse_bump_check() {
        let cli =
            Cli::try_parse_from(["relock", "bump", "--bom", "v.properties", "--check"]).unwrap();
        assert!(matches!(cli.command, Commands::Bump { check: true, .. }));
    }

    #[test]
    fn test_cli_bump_requires_bom() {
        assert!(Cli::try_parse_from(["relock", "bump"]).is_err());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["relock", "check", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_manifest_and_filter_overrides() {
        let cli = Cli::try_parse_from([
            "relock",
            "--manifest",
            "third_party/WORKSPACE",
            "--filter",
            ".*com\\.example.*",
            "check",
        ])
        .unwrap();
        assert_eq!(cli.manifest, Some(PathBuf::from("third_party/WORKSPACE")));
        assert_eq!(cli.filter.as_deref(), Some(".*com\\.example.*"));
    }

    #[test]
    fn test_cli_parse_hidden_parse_command() {
        let cli = Cli::try_parse_from(["relock", "parse"]).unwrap();
        assert!(matches!(cli.command, Commands::Parse));
    }
}
