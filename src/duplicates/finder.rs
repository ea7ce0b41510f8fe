//! Scan session: the single-pass duplicate elimination loop.
//!
//! # Overview
//!
//! A [`ScanSession`] owns everything a run needs: the signature index, the
//! verifier, the elimination policy, the optional script writer, and the
//! counters. Candidates are processed strictly one at a time:
//!
//! 1. **Probe**: stat, skip zero-length files, resolve identity, compute the
//!    prefix signature.
//! 2. **Place**: look the signature up; verify against each chain member in
//!    turn; hand confirmed duplicates to the policy.
//! 3. **Store**: anything not absorbed is appended to its chain and kept
//!    for the rest of the run.
//!
//! # Example
//!
//! ```no_run
//! use finddupe::actions::{Mode, Remedy};
//! use finddupe::duplicates::{EngineConfig, ScanSession};
//! use std::path::Path;
//!
//! let config = EngineConfig::new(Mode::Eliminate(Remedy::Hardlink));
//! let mut session: ScanSession = ScanSession::new(config).unwrap();
//! session.scan_path(Path::new("/srv/photos")).unwrap();
//! let report = session.finish().unwrap();
//!
//! println!("{} duplicates, {} bytes", report.summary.duplicate_files, report.summary.duplicate_bytes);
//! ```

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::groups::{FileRecord, GroupKey, Placement, Resolution, SignatureIndex};
use super::hardlinks::{collect_hardlink_groups, HardlinkGroup};
use super::verify::{Verdict, Verifier};
use crate::actions::{EliminateError, EliminationPolicy, Mode, Outcome, DEFAULT_LINK_LIMIT};
use crate::output::script::ScriptWriter;
use crate::progress::{NoProgress, ProgressCallback};
use crate::scanner::{
    compute_signature, resolve_identity, ReadError, Signature, Walker, WalkerConfig,
};

/// Engine configuration surface.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// What to do with duplicates.
    pub mode: Mode,
    /// Skip zero-length files instead of treating them as duplicates.
    pub skip_zero_length: bool,
    /// Allow read-only duplicates to be eliminated.
    pub allow_readonly: bool,
    /// Per-file hard link cap.
    pub link_limit: u64,
    /// Do not warn about files that cannot be read.
    pub hide_unreadable_warning: bool,
    /// Traversal options.
    pub walker: WalkerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(Mode::Report)
    }
}

impl EngineConfig {
    /// Defaults for `mode`.
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            skip_zero_length: true,
            allow_readonly: false,
            link_limit: DEFAULT_LINK_LIMIT,
            hide_unreadable_warning: false,
            walker: WalkerConfig::default(),
        }
    }

    /// Set whether zero-length files are skipped.
    #[must_use]
    pub fn with_skip_zero_length(mut self, skip: bool) -> Self {
        self.skip_zero_length = skip;
        self
    }

    /// Allow read-only duplicates to be eliminated.
    #[must_use]
    pub fn with_allow_readonly(mut self, allow: bool) -> Self {
        self.allow_readonly = allow;
        self
    }

    /// Set the per-file hard link cap.
    #[must_use]
    pub fn with_link_limit(mut self, limit: u64) -> Self {
        self.link_limit = limit;
        self
    }

    /// Silence unreadable-file warnings.
    #[must_use]
    pub fn with_hide_unreadable_warning(mut self, hide: bool) -> Self {
        self.hide_unreadable_warning = hide;
        self
    }

    /// Set the traversal options.
    #[must_use]
    pub fn with_walker_config(mut self, walker: WalkerConfig) -> Self {
        self.walker = walker;
        self
    }

    /// Check option combinations.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::InvalidConfig`] if discovery mode is combined
    /// with anything that would modify files.
    pub fn validate(&self) -> Result<(), FinderError> {
        if self.mode == Mode::DiscoverHardlinks && self.allow_readonly {
            return Err(FinderError::InvalidConfig(
                "hardlink discovery is read-only and cannot be combined with --readonly".into(),
            ));
        }
        Ok(())
    }
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    /// Files probed successfully (zero-length skips excluded).
    pub total_files: usize,
    /// Bytes in those files.
    pub total_bytes: u64,
    /// Of which came from reference paths.
    pub reference_files: usize,
    /// Confirmed content duplicates (existing hard links excluded).
    pub duplicate_files: usize,
    /// Bytes in those duplicates.
    pub duplicate_bytes: u64,
    /// Duplicates that were already hard links of the kept file.
    pub hardlinked_instances: usize,
    /// Duplicates deleted, hardlinked, or scripted.
    pub eliminated_files: usize,
    /// Bytes freed (or to be freed by the script).
    pub reclaimed_bytes: u64,
    /// Zero-length files skipped.
    pub zero_length_files: usize,
    /// Files that could not be opened or read.
    pub unreadable_files: usize,
    /// Traversal errors (unreadable directories and such).
    pub walk_errors: usize,
    /// Read-only duplicates left alone.
    pub readonly_skipped: usize,
    /// Duplicates left alone because the kept file hit the link cap.
    pub link_limit_skipped: usize,
    /// Duplicates left alone because they live on another volume.
    pub cross_volume_skipped: usize,
    /// Equal signatures with different content.
    pub signature_collisions: usize,
    /// Content comparisons performed.
    pub byte_comparisons: u64,
    /// Hard-link groups reported (discovery mode).
    pub hardlink_groups: usize,
    /// The run was stopped by Ctrl+C.
    pub interrupted: bool,
    /// Wall time of the run.
    #[serde(skip)]
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Total size in kBytes, as printed in the summary.
    #[must_use]
    pub fn total_kbytes(&self) -> u64 {
        self.total_bytes / 1000
    }

    /// Duplicate size in kBytes.
    #[must_use]
    pub fn duplicate_kbytes(&self) -> u64 {
        self.duplicate_bytes / 1000
    }

    /// Human-readable reclaimed size.
    #[must_use]
    pub fn reclaimed_display(&self) -> String {
        bytesize::ByteSize::b(self.reclaimed_bytes).to_string()
    }
}

/// Errors that end a run.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// Options that cannot be combined.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A filesystem mutation failed mid-elimination.
    #[error(transparent)]
    Fatal(#[from] EliminateError),

    /// The script could not be flushed.
    #[error("writing script failed: {0}")]
    Script(#[source] io::Error),
}

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// A path to deduplicate.
    Candidate,
    /// A reference path: stored unverified, never eliminated.
    Reference,
}

/// Final state of a run.
#[derive(Debug)]
pub struct ScanReport<W = File> {
    /// Counters.
    pub summary: ScanSummary,
    /// Clusters found in discovery mode.
    pub hardlink_groups: Vec<HardlinkGroup>,
    /// Every record kept during the run.
    pub index: SignatureIndex<GroupKey>,
    /// The script writer's output, flushed.
    pub script: Option<W>,
}

/// One run of the engine.
pub struct ScanSession<W: Write = File> {
    config: EngineConfig,
    policy: EliminationPolicy,
    index: SignatureIndex<GroupKey>,
    verifier: Verifier,
    summary: ScanSummary,
    script: Option<ScriptWriter<W>>,
    progress: Box<dyn ProgressCallback>,
    shutdown_flag: Option<Arc<AtomicBool>>,
    seen: usize,
    started: Instant,
}

impl<W: Write> std::fmt::Debug for ScanSession<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("config", &self.config)
            .field("records", &self.index.len())
            .field("summary", &self.summary)
            .field("script", &self.script.is_some())
            .finish_non_exhaustive()
    }
}

impl<W: Write> ScanSession<W> {
    /// Start a session.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::InvalidConfig`] for invalid option mixes.
    pub fn new(config: EngineConfig) -> Result<Self, FinderError> {
        config.validate()?;
        let policy = EliminationPolicy::new(config.mode)
            .with_allow_readonly(config.allow_readonly)
            .with_link_limit(config.link_limit);
        Ok(Self {
            config,
            policy,
            index: SignatureIndex::new(),
            verifier: Verifier::new(),
            summary: ScanSummary::default(),
            script: None,
            progress: Box::new(NoProgress),
            shutdown_flag: None,
            seen: 0,
            started: Instant::now(),
        })
    }

    /// Send eliminations to `script` (script mode).
    #[must_use]
    pub fn with_script(mut self, script: ScriptWriter<W>) -> Self {
        self.script = Some(script);
        self
    }

    /// Report events to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Box<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Stop before the next candidate once `flag` is set.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Counters so far.
    #[must_use]
    pub fn summary(&self) -> &ScanSummary {
        &self.summary
    }

    /// Records kept so far.
    #[must_use]
    pub fn index(&self) -> &SignatureIndex<GroupKey> {
        &self.index
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Walk `root` and process every candidate below it.
    ///
    /// Returns the number of files the walk yielded.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Interrupted`] on Ctrl+C, or
    /// [`FinderError::Fatal`] if an elimination fails.
    pub fn scan_path(&mut self, root: &Path) -> Result<usize, FinderError> {
        self.scan(root, Source::Candidate)
    }

    /// Walk `root` and store every file as a reference, unverified.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Interrupted`] on Ctrl+C.
    pub fn scan_reference(&mut self, root: &Path) -> Result<usize, FinderError> {
        self.scan(root, Source::Reference)
    }

    fn scan(&mut self, root: &Path, source: Source) -> Result<usize, FinderError> {
        if matches!(self.config.mode, Mode::Script(_)) && self.script.is_none() {
            return Err(FinderError::InvalidConfig(
                "script mode needs a script output".into(),
            ));
        }
        let walker = Walker::new(root, self.config.walker.clone());
        let mut matched = 0;
        for entry in walker.walk() {
            if self.is_shutdown_requested() {
                self.summary.interrupted = true;
                return Err(FinderError::Interrupted);
            }
            match entry {
                Ok(path) => {
                    matched += 1;
                    self.process_file(&path, source)?;
                }
                Err(e) => {
                    self.summary.walk_errors += 1;
                    log::debug!("Walk error: {}", e);
                }
            }
        }
        if matched == 0 {
            log::warn!("No files matched '{}'", root.display());
        }
        Ok(matched)
    }

    /// Probe and place one file.
    ///
    /// Unreadable files are counted and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Fatal`] if an elimination fails.
    pub fn process_file(&mut self, path: &Path, source: Source) -> Result<(), FinderError> {
        self.seen += 1;
        self.progress.on_file(self.seen, path);

        let size = match std::fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                self.note_unreadable(&ReadError::from_io(path, e));
                return Ok(());
            }
        };
        if size == 0 && self.config.skip_zero_length {
            self.summary.zero_length_files += 1;
            return Ok(());
        }

        let identity = match resolve_identity(path) {
            Ok(identity) => identity,
            Err(e) => {
                self.note_unreadable(&e);
                return Ok(());
            }
        };

        if self.config.mode == Mode::DiscoverHardlinks {
            if identity.links <= 1 {
                return Ok(());
            }
            log::debug!(
                "Hardlinked ({} links) node={:08x} {:08x}: {}",
                identity.links,
                identity.id.volume,
                identity.id.index,
                path.display()
            );
            let record = FileRecord::new(path.to_path_buf(), size, Signature::default(), identity);
            self.count_stored(&record, source);
            self.index.append(GroupKey::Identity(identity.id), record);
            return Ok(());
        }

        let (signature, size) = match compute_signature(path) {
            Ok(v) => v,
            Err(e) => {
                self.note_unreadable(&e);
                return Ok(());
            }
        };
        self.progress.on_signature(signature, size, path);

        let record = FileRecord::new(path.to_path_buf(), size, signature, identity);
        self.count_stored(&record, source);
        let key = GroupKey::Content(signature);

        if source == Source::Reference {
            self.index.append(key, record);
            return Ok(());
        }

        let placement = self.place(key, record)?;
        log::trace!("{}: {:?}", path.display(), placement);
        Ok(())
    }

    fn count_stored(&mut self, record: &FileRecord, source: Source) {
        self.summary.total_files += 1;
        self.summary.total_bytes += record.size;
        if source == Source::Reference {
            self.summary.reference_files += 1;
        }
    }

    fn place(&mut self, key: GroupKey, record: FileRecord) -> Result<Placement, FinderError> {
        let Self {
            index,
            verifier,
            summary,
            policy,
            script,
            progress,
            ..
        } = self;

        // A candidate is counted once, however many chain members it matches.
        let mut counted = false;
        let mut deferred_skip = None;
        let placement = index.insert_with(key, record, |candidate, existing| {
            let already_linked = match verifier.verify(candidate, existing) {
                Verdict::DistinctCollision => {
                    summary.signature_collisions += 1;
                    return Ok(Resolution::Continue);
                }
                Verdict::Duplicate { already_linked } => already_linked,
            };

            if !counted {
                counted = true;
                if already_linked {
                    summary.hardlinked_instances += 1;
                } else {
                    summary.duplicate_files += 1;
                    summary.duplicate_bytes += candidate.size;
                }
            }
            progress.on_duplicate(&existing.path, &candidate.path, already_linked);

            let outcome = policy.apply(candidate, existing, already_linked, script.as_mut())?;
            progress.on_outcome(&candidate.path, outcome);
            if outcome.absorbs_candidate() {
                tally(summary, outcome, candidate.size, already_linked);
                return Ok(Resolution::Absorbed);
            }
            // Only counted if no later chain member takes the candidate.
            if outcome != Outcome::NotDuplicate {
                deferred_skip = Some(outcome);
            }
            Ok::<_, EliminateError>(Resolution::Continue)
        })?;

        if let (Some(skip), Some(_)) = (deferred_skip, placement.stored_id()) {
            tally(summary, skip, 0, false);
        }
        summary.byte_comparisons = verifier.byte_comparisons();
        Ok(placement)
    }

    fn note_unreadable(&mut self, error: &ReadError) {
        self.summary.unreadable_files += 1;
        if !self.config.hide_unreadable_warning {
            log::warn!("Could not read '{}': {}", error.path().display(), error);
        }
    }

    /// End the run: flush the script and collect discovery results.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Script`] if the script cannot be flushed.
    pub fn finish(mut self) -> Result<ScanReport<W>, FinderError> {
        self.progress.on_finish();
        self.summary.scan_duration = self.started.elapsed();
        self.summary.byte_comparisons = self.verifier.byte_comparisons();

        let hardlink_groups = if self.config.mode == Mode::DiscoverHardlinks {
            collect_hardlink_groups(&self.index)
        } else {
            Vec::new()
        };
        self.summary.hardlink_groups = hardlink_groups.len();

        let script = self
            .script
            .take()
            .map(ScriptWriter::finish)
            .transpose()
            .map_err(FinderError::Script)?;

        log::debug!(
            "Scan finished in {:?}: {} files, {} duplicates, {} collisions",
            self.summary.scan_duration,
            self.summary.total_files,
            self.summary.duplicate_files,
            self.summary.signature_collisions
        );

        Ok(ScanReport {
            summary: self.summary,
            hardlink_groups,
            index: self.index,
            script,
        })
    }
}

fn tally(summary: &mut ScanSummary, outcome: Outcome, size: u64, already_linked: bool) {
    match outcome {
        Outcome::Deleted | Outcome::Hardlinked | Outcome::Scripted(_) => {
            summary.eliminated_files += 1;
            if !already_linked {
                summary.reclaimed_bytes += size;
            }
        }
        Outcome::SkippedReadOnly => summary.readonly_skipped += 1,
        Outcome::SkippedLinkLimit => summary.link_limit_skipped += 1,
        Outcome::SkippedCrossVolume => summary.cross_volume_skipped += 1,
        Outcome::NotDuplicate | Outcome::Reported | Outcome::NoOpAlreadyLinked => {}
    }
}
