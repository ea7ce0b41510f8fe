//! Progress and per-file reporting using indicatif.
//!
//! The scan session reports what it sees through [`ProgressCallback`]. The
//! terminal implementation, [`Progress`], keeps a spinner with the scanned
//! count and current path, and prints duplicate listings above it.

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use yansi::Paint;

use crate::actions::Outcome;
use crate::scanner::Signature;

/// Observer of scan events.
///
/// All methods except [`on_file`](Self::on_file) have empty defaults.
pub trait ProgressCallback {
    /// A candidate is about to be probed; `count` is 1-based.
    fn on_file(&self, count: usize, path: &Path);

    /// A signature was computed.
    fn on_signature(&self, _signature: Signature, _size: u64, _path: &Path) {}

    /// `candidate` was confirmed to duplicate `kept`.
    fn on_duplicate(&self, _kept: &Path, _candidate: &Path, _already_linked: bool) {}

    /// The policy decided `outcome` for `candidate`.
    fn on_outcome(&self, _candidate: &Path, _outcome: Outcome) {}

    /// The scan loop finished (or stopped).
    fn on_finish(&self) {}
}

/// Callback that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_file(&self, _count: usize, _path: &Path) {}
}

/// Terminal progress reporter.
#[derive(Debug)]
pub struct Progress {
    bar: Option<ProgressBar>,
    list_duplicates: bool,
    print_signatures: bool,
}

impl Progress {
    /// Create a reporter; `show_spinner` false keeps the terminal quiet.
    ///
    /// # Examples
    ///
    /// ```
    /// use finddupe::progress::Progress;
    ///
    /// let progress = Progress::new(false).with_listing(true);
    /// ```
    #[must_use]
    pub fn new(show_spinner: bool) -> Self {
        let bar = show_spinner.then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        Self {
            bar,
            list_duplicates: false,
            print_signatures: false,
        }
    }

    /// Print `Duplicate:` / `With:` pairs and outcome notes.
    #[must_use]
    pub fn with_listing(mut self, enabled: bool) -> Self {
        self.list_duplicates = enabled;
        self
    }

    /// Print one signature line per probed file.
    #[must_use]
    pub fn with_signatures(mut self, enabled: bool) -> Self {
        self.print_signatures = enabled;
        self
    }

    /// Print a line to stdout without tearing the spinner.
    pub fn println(&self, line: &str) {
        match &self.bar {
            Some(pb) => pb.suspend(|| println!("{}", line)),
            None => println!("{}", line),
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} Scanned {pos:>5} files: {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
}

impl ProgressCallback for Progress {
    fn on_file(&self, count: usize, path: &Path) {
        if let Some(pb) = &self.bar {
            pb.set_position(count as u64);
            pb.set_message(truncate_path(&path.to_string_lossy(), 50));
        }
    }

    fn on_signature(&self, signature: Signature, size: u64, path: &Path) {
        if self.print_signatures {
            self.println(&format!("{} {:>10} {}", signature, size, path.display()));
        }
    }

    fn on_duplicate(&self, kept: &Path, candidate: &Path, already_linked: bool) {
        if !self.list_duplicates {
            return;
        }
        self.println(&format!("{} '{}'", "Duplicate:".bold(), kept.display()));
        self.println(&format!("{}      '{}'", "With:".bold(), candidate.display()));
        if already_linked {
            self.println(&format!(
                "    {}",
                "(hardlinked instances of same file)".dim()
            ));
        }
    }

    fn on_outcome(&self, candidate: &Path, outcome: Outcome) {
        if !self.list_duplicates {
            return;
        }
        let note = match outcome {
            Outcome::Hardlinked => "    Created hardlink".green().to_string(),
            Outcome::Deleted => "    Deleted duplicate".green().to_string(),
            Outcome::SkippedReadOnly => format!(
                "{} '{}'",
                "Skipping duplicate readonly file".yellow(),
                candidate.display()
            ),
            Outcome::SkippedLinkLimit => "    Skipped: link limit reached".yellow().to_string(),
            Outcome::SkippedCrossVolume => "    Skipped: different volume".yellow().to_string(),
            Outcome::NotDuplicate
            | Outcome::Reported
            | Outcome::NoOpAlreadyLinked
            | Outcome::Scripted(_) => return,
        };
        self.println(&note);
    }

    fn on_finish(&self) {
        if let Some(pb) = &self.bar {
            pb.finish_and_clear();
        }
    }
}

/// Truncate a path for display in the spinner.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name
            .chars()
            .skip(name_len.saturating_sub(max_len.saturating_sub(3)))
            .collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}
