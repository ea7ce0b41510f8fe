//! End-of-run reports.
//!
//! Text output keeps the classic layout:
//!
//! ```text
//! Files:     1234 kBytes in   120 files
//! Dupes:      456 kBytes in    14 files
//!   3 files of zero length were skipped
//!   1 files could not be opened
//! ```
//!
//! Discovery runs print one block per hard-link group instead. The JSON
//! form carries the same counters for automation.

use std::io::{self, Write};

use serde::Serialize;

use crate::actions::Mode;
use crate::duplicates::{HardlinkGroup, ScanSummary};
use crate::error::ExitCode;

/// Write the text summary for a content scan.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_text<W: Write>(out: &mut W, summary: &ScanSummary, mode: Mode) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "Files: {:>8} kBytes in {:>5} files",
        summary.total_kbytes(),
        summary.total_files
    )?;
    writeln!(
        out,
        "Dupes: {:>8} kBytes in {:>5} files",
        summary.duplicate_kbytes(),
        summary.duplicate_files
    )?;
    if summary.eliminated_files > 0 {
        let verb = match mode {
            Mode::Script(_) => "scripted",
            _ => "eliminated",
        };
        writeln!(
            out,
            "  {} files {}, {} reclaimed",
            summary.eliminated_files,
            verb,
            summary.reclaimed_display()
        )?;
    }
    write_skip_counts(out, summary)
}

/// Write every hard-link group followed by the group count.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_hardlink_groups<W: Write>(
    out: &mut W,
    groups: &[HardlinkGroup],
    summary: &ScanSummary,
) -> io::Result<()> {
    for group in groups {
        writeln!(out)?;
        writeln!(
            out,
            "Hardlink group, {} of {} hardlinked instances found in search tree:",
            group.found(),
            group.total_links
        )?;
        for path in &group.paths {
            writeln!(out, "  \"{}\"", path.display())?;
        }
    }
    writeln!(out)?;
    writeln!(out, "Number of hardlink groups found: {}", groups.len())?;
    write_skip_counts(out, summary)
}

fn write_skip_counts<W: Write>(out: &mut W, summary: &ScanSummary) -> io::Result<()> {
    if summary.zero_length_files > 0 {
        writeln!(
            out,
            "  {} files of zero length were skipped",
            summary.zero_length_files
        )?;
    }
    if summary.unreadable_files > 0 {
        writeln!(
            out,
            "  {} files could not be opened",
            summary.unreadable_files
        )?;
    }
    if summary.readonly_skipped > 0 {
        writeln!(
            out,
            "  {} readonly duplicates were skipped",
            summary.readonly_skipped
        )?;
    }
    if summary.link_limit_skipped > 0 {
        writeln!(
            out,
            "  {} duplicates were skipped at the hard link limit",
            summary.link_limit_skipped
        )?;
    }
    if summary.cross_volume_skipped > 0 {
        writeln!(
            out,
            "  {} duplicates were on a different volume",
            summary.cross_volume_skipped
        )?;
    }
    Ok(())
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport<'a> {
    /// Scan counters
    pub summary: &'a ScanSummary,
    /// Hard-link groups (discovery mode only)
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub hardlink_groups: &'a [HardlinkGroup],
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "FD000")
    pub exit_code_name: &'static str,
}

impl<'a> JsonReport<'a> {
    /// Assemble the report.
    #[must_use]
    pub fn new(summary: &'a ScanSummary, groups: &'a [HardlinkGroup], exit_code: ExitCode) -> Self {
        Self {
            summary,
            hardlink_groups: groups,
            scan_duration_ms: u64::try_from(summary.scan_duration.as_millis()).unwrap_or(u64::MAX),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
        }
    }

    /// Write pretty-printed JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, self)?;
        writeln!(out)
    }
}
