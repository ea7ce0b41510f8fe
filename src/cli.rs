//! Command-line interface definitions for finddupe.
//!
//! # Example
//!
//! ```bash
//! # List duplicates under two trees
//! finddupe ~/Photos /mnt/backup/Photos
//!
//! # Replace duplicates with hard links
//! finddupe --hardlink ~/Photos
//!
//! # Write a deletion script instead, keeping everything under --ref
//! finddupe --delete --script cleanup.sh --ref ~/Archive ~/Downloads
//!
//! # Show existing hard-link clusters
//! finddupe --list-links /srv
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::actions::{Mode, Remedy};
use crate::output::script::ScriptType;

/// Find duplicate files, then hard link, delete, or script them.
///
/// Files are grouped by a signature of their first 32 KiB and their length,
/// and every match is confirmed byte for byte before anything is touched.
/// The first file seen is always the one kept.
#[derive(Debug, Parser)]
#[command(name = "finddupe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Files or directories to scan, in order
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Reference paths: never modified, scanned before every PATH
    ///
    /// Files here are kept as originals. Duplicates of them in PATH are
    /// eliminated; duplicates among reference files are not looked for.
    /// All references are scanned before any PATH, wherever --ref appears
    /// on the command line.
    #[arg(long = "ref", value_name = "PATH")]
    pub reference_paths: Vec<PathBuf>,

    /// Replace duplicates with hard links to the kept file
    #[arg(long, conflicts_with = "delete")]
    pub hardlink: bool,

    /// Delete duplicates
    #[arg(long)]
    pub delete: bool,

    /// Write the commands to FILE instead of running them
    ///
    /// Writes a hard-link script unless --delete is given.
    #[arg(long, value_name = "FILE")]
    pub script: Option<PathBuf>,

    /// Dialect of the script written by --script
    #[arg(long, value_enum, value_name = "TYPE", requires = "script")]
    pub script_type: Option<ScriptType>,

    /// List clusters of existing hard links instead of looking for duplicates
    #[arg(long, conflicts_with_all = ["hardlink", "delete", "script", "readonly"])]
    pub list_links: bool,

    /// Also eliminate read-only duplicates
    #[arg(long)]
    pub readonly: bool,

    /// Treat zero-length files as duplicates of each other
    #[arg(short = 'z', long)]
    pub keep_empty: bool,

    /// Do not warn about files that cannot be opened
    #[arg(short = 'u', long)]
    pub hide_unreadable: bool,

    /// Hide the progress spinner
    #[arg(short = 'p', long)]
    pub no_progress: bool,

    /// Follow symbolic links
    ///
    /// Warning: May visit the same file twice through different links.
    #[arg(short = 'j', long)]
    pub follow_links: bool,

    /// Print the signature and size of every file scanned
    #[arg(long)]
    pub print_sigs: bool,

    /// Maximum number of hard links per file
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub link_limit: Option<u64>,

    /// Glob patterns to skip (can be specified multiple times)
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Summary format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Read settings from this file instead of the platform config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Report errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}

impl Cli {
    /// The engine mode selected by the flags.
    #[must_use]
    pub fn mode(&self) -> Mode {
        let remedy = if self.delete {
            Remedy::Delete
        } else {
            Remedy::Hardlink
        };
        if self.list_links {
            Mode::DiscoverHardlinks
        } else if self.script.is_some() {
            Mode::Script(remedy)
        } else if self.hardlink || self.delete {
            Mode::Eliminate(remedy)
        } else {
            Mode::Report
        }
    }
}

/// Output format for the end-of-run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing and summary
    Text,
    /// JSON summary for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
