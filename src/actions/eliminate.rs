//! Elimination policy for confirmed duplicates.
//!
//! # Overview
//!
//! Once the verifier has confirmed that a candidate duplicates a kept file,
//! [`EliminationPolicy::apply`] decides what happens to the candidate and
//! carries it out. Rules are checked in a fixed order:
//!
//! 1. Report mode only reports.
//! 2. A read-only candidate is skipped unless explicitly allowed.
//! 3. Hardlinking two names of the same file is a no-op.
//! 4. Hardlinking across volumes is skipped.
//! 5. Hardlinking onto a file at the link cap is skipped.
//! 6. Otherwise the remedy is performed, or written to a script.
//!
//! # Safety
//!
//! A direct hardlink first creates the new link beside the candidate and
//! then renames it over the candidate, so a failure never leaves the
//! candidate's name missing. Any unexpected failure while mutating the
//! filesystem is returned as an [`EliminateError`] and ends the run.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use thiserror::Error;

use crate::duplicates::groups::FileRecord;
use crate::output::script::ScriptWriter;

/// Default per-file hard link cap.
pub const DEFAULT_LINK_LIMIT: u64 = 1023;

/// How a confirmed duplicate is remedied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Remedy {
    /// Replace the duplicate with a hard link to the kept file.
    Hardlink,
    /// Remove the duplicate.
    Delete,
}

/// What the engine does with the files it sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Report duplicates without touching anything.
    #[default]
    Report,
    /// Apply the remedy directly to the filesystem.
    Eliminate(Remedy),
    /// Write the remedy to a script instead of applying it.
    Script(Remedy),
    /// Report clusters of existing hard links.
    DiscoverHardlinks,
}

impl Mode {
    /// The remedy, if this mode has one.
    #[must_use]
    pub fn remedy(&self) -> Option<Remedy> {
        match *self {
            Self::Eliminate(r) | Self::Script(r) => Some(r),
            Self::Report | Self::DiscoverHardlinks => None,
        }
    }

    /// Returns `true` if this mode mutates the filesystem directly.
    #[must_use]
    pub fn mutates(&self) -> bool {
        matches!(self, Self::Eliminate(_))
    }
}

/// Decision taken for one confirmed duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Not a duplicate of the compared file.
    NotDuplicate,
    /// Listed only.
    Reported,
    /// The candidate is read-only and read-only files are protected.
    SkippedReadOnly,
    /// The kept file has reached the link cap.
    SkippedLinkLimit,
    /// The two files are on different volumes.
    SkippedCrossVolume,
    /// Both names already refer to the same file.
    NoOpAlreadyLinked,
    /// The candidate was removed.
    Deleted,
    /// The candidate was replaced by a hard link.
    Hardlinked,
    /// The remedy was written to the script.
    Scripted(Remedy),
}

impl Outcome {
    /// Returns `true` if the candidate is consumed and must not be stored.
    ///
    /// Candidates skipped because of the link cap or a volume boundary stay
    /// available as link targets for later files.
    #[must_use]
    pub fn absorbs_candidate(&self) -> bool {
        !matches!(
            self,
            Self::NotDuplicate | Self::SkippedLinkLimit | Self::SkippedCrossVolume
        )
    }
}

/// Fatal failure while mutating the filesystem.
#[derive(Debug, Error)]
pub enum EliminateError {
    /// The candidate could not be stat'ed.
    #[error("stat failed on {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The read-only attribute could not be cleared.
    #[error("could not make {path} writable: {source}")]
    Permissions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The candidate could not be removed.
    #[error("delete of {path} failed: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The replacement link could not be created.
    #[error("create hard link from {kept} to {path} failed: {source}")]
    Link {
        path: PathBuf,
        kept: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The replacement link could not be moved over the candidate.
    #[error("rename of {from} onto {path} failed: {source}")]
    Rename {
        path: PathBuf,
        from: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The script could not be written.
    #[error("writing script failed: {0}")]
    Script(#[source] io::Error),
}

impl EliminateError {
    /// Get the path associated with this error (if any).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Stat { path, .. }
            | Self::Permissions { path, .. }
            | Self::Delete { path, .. }
            | Self::Link { path, .. }
            | Self::Rename { path, .. } => Some(path),
            Self::Script(_) => None,
        }
    }
}

/// Rules applied to each confirmed duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EliminationPolicy {
    mode: Mode,
    allow_readonly: bool,
    link_limit: u64,
}

impl Default for EliminationPolicy {
    fn default() -> Self {
        Self::new(Mode::Report)
    }
}

impl EliminationPolicy {
    /// Create a policy for `mode` with read-only files protected.
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            allow_readonly: false,
            link_limit: DEFAULT_LINK_LIMIT,
        }
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

    /// Mode this policy acts in.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Decide and perform the fate of `candidate`, a verified duplicate of `kept`.
    ///
    /// `kept.identity.links` is updated to reflect any link created or removed.
    ///
    /// # Errors
    ///
    /// Returns [`EliminateError`] if a filesystem mutation fails or the
    /// script cannot be written. The caller must stop the run.
    pub fn apply<W: Write>(
        &self,
        candidate: &FileRecord,
        kept: &mut FileRecord,
        already_linked: bool,
        script: Option<&mut ScriptWriter<W>>,
    ) -> Result<Outcome, EliminateError> {
        let remedy = match self.mode {
            Mode::Report => return Ok(Outcome::Reported),
            // Discovery never verifies, so it never gets here.
            Mode::DiscoverHardlinks => return Ok(Outcome::NotDuplicate),
            Mode::Eliminate(r) | Mode::Script(r) => r,
        };

        if remedy == Remedy::Delete && already_linked && !other_name_survives(candidate, kept) {
            log::warn!(
                "'{}' is the only name of '{}', not deleting",
                candidate.path.display(),
                kept.path.display()
            );
            return Ok(Outcome::NoOpAlreadyLinked);
        }

        let metadata = fs::metadata(&candidate.path).map_err(|source| EliminateError::Stat {
            path: candidate.path.clone(),
            source,
        })?;
        let readonly = is_readonly(&metadata);

        if readonly && !self.allow_readonly {
            log::debug!("Skipping duplicate readonly file '{}'", candidate.path.display());
            return Ok(Outcome::SkippedReadOnly);
        }

        if remedy == Remedy::Hardlink {
            if already_linked {
                return Ok(Outcome::NoOpAlreadyLinked);
            }
            if !kept.identity.same_volume(&candidate.identity) {
                log::warn!(
                    "Cannot hardlink across volumes: '{}' and '{}'",
                    kept.path.display(),
                    candidate.path.display()
                );
                return Ok(Outcome::SkippedCrossVolume);
            }
            if kept.identity.links >= self.link_limit {
                log::warn!(
                    "'{}' already has {} links, leaving '{}' alone",
                    kept.path.display(),
                    kept.identity.links,
                    candidate.path.display()
                );
                return Ok(Outcome::SkippedLinkLimit);
            }
        }

        if let Mode::Script(_) = self.mode {
            let script = script.ok_or_else(|| {
                EliminateError::Script(io::Error::other("no script output configured"))
            })?;
            let written = match remedy {
                Remedy::Delete => script.delete(&kept.path, &candidate.path, readonly),
                Remedy::Hardlink => script.link(&kept.path, &candidate.path, readonly),
            }
            .map_err(EliminateError::Script)?;
            if !written {
                return Ok(Outcome::Reported);
            }
            match remedy {
                Remedy::Hardlink => kept.identity.links += 1,
                Remedy::Delete if already_linked => {
                    kept.identity.links = kept.identity.links.saturating_sub(1);
                }
                Remedy::Delete => {}
            }
            return Ok(Outcome::Scripted(remedy));
        }

        let original = metadata.permissions();
        // Unlinking on Unix needs only a writable directory; clearing the bit
        // would strip it from every other name of a shared inode.
        let unlock = readonly && (remedy == Remedy::Hardlink || cfg!(not(unix)));
        if unlock {
            make_writable(&candidate.path, &metadata)?;
        }

        match remedy {
            Remedy::Delete => {
                fs::remove_file(&candidate.path).map_err(|source| EliminateError::Delete {
                    path: candidate.path.clone(),
                    source,
                })?;
                if already_linked {
                    kept.identity.links = kept.identity.links.saturating_sub(1);
                    if unlock {
                        restore_permissions(&kept.path, original);
                    }
                }
                log::debug!("Deleted duplicate '{}'", candidate.path.display());
                Ok(Outcome::Deleted)
            }
            Remedy::Hardlink => {
                match replace_with_link(&kept.path, &candidate.path)? {
                    Replaced::Done => {}
                    Replaced::Refused(outcome) => {
                        if readonly {
                            restore_permissions(&candidate.path, original);
                        }
                        return Ok(outcome);
                    }
                }
                restore_permissions(&candidate.path, original);
                restore_mtime(&candidate.path, &metadata);
                kept.identity.links += 1;
                log::debug!(
                    "Created hardlink '{}' -> '{}'",
                    candidate.path.display(),
                    kept.path.display()
                );
                Ok(Outcome::Hardlinked)
            }
        }
    }
}

enum Replaced {
    Done,
    /// The OS declined the link for a reason that is a policy skip.
    Refused(Outcome),
}

/// Attempts at finding a free temporary name before giving up.
const TEMP_ATTEMPTS: u32 = 16;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Create a link to `kept` beside `candidate`, then move it over `candidate`.
fn replace_with_link(kept: &Path, candidate: &Path) -> Result<Replaced, EliminateError> {
    let mut attempt = 0;
    let temp = loop {
        let temp = temp_sibling(candidate);
        let source = match fs::hard_link(kept, &temp) {
            Ok(()) => break temp,
            Err(source) => source,
        };
        match source.kind() {
            io::ErrorKind::AlreadyExists if attempt + 1 < TEMP_ATTEMPTS => attempt += 1,
            io::ErrorKind::TooManyLinks => {
                log::warn!("Link cap reached on '{}'", kept.display());
                return Ok(Replaced::Refused(Outcome::SkippedLinkLimit));
            }
            io::ErrorKind::CrossesDevices => {
                return Ok(Replaced::Refused(Outcome::SkippedCrossVolume))
            }
            _ => {
                return Err(EliminateError::Link {
                    path: candidate.to_path_buf(),
                    kept: kept.to_path_buf(),
                    source,
                })
            }
        }
    };

    if let Err(source) = fs::rename(&temp, candidate) {
        if let Err(e) = fs::remove_file(&temp) {
            log::error!("Could not remove temporary link '{}': {}", temp.display(), e);
        }
        return Err(EliminateError::Rename {
            path: candidate.to_path_buf(),
            from: temp,
            source,
        });
    }

    Ok(Replaced::Done)
}

/// Short hidden name in the candidate's directory, independent of the
/// candidate's own name length.
fn temp_sibling(path: &Path) -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".fd-{}-{}.tmp", std::process::id(), n))
}

/// Deleting `candidate` is safe only if the data stays reachable through a
/// different directory entry.
fn other_name_survives(candidate: &FileRecord, kept: &FileRecord) -> bool {
    if kept.identity.links <= 1 {
        return false;
    }
    match (
        fs::canonicalize(&candidate.path),
        fs::canonicalize(&kept.path),
    ) {
        (Ok(a), Ok(b)) => a != b,
        _ => false,
    }
}

#[cfg(unix)]
fn is_readonly(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o200 == 0
}

#[cfg(not(unix))]
fn is_readonly(metadata: &fs::Metadata) -> bool {
    metadata.permissions().readonly()
}

fn make_writable(path: &Path, metadata: &fs::Metadata) -> Result<(), EliminateError> {
    let mut permissions = metadata.permissions();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        permissions.set_mode(permissions.mode() | 0o200);
    }
    #[cfg(not(unix))]
    permissions.set_readonly(false);

    fs::set_permissions(path, permissions).map_err(|source| EliminateError::Permissions {
        path: path.to_path_buf(),
        source,
    })
}

fn restore_permissions(path: &Path, permissions: fs::Permissions) {
    if let Err(e) = fs::set_permissions(path, permissions) {
        log::warn!("Could not restore permissions on '{}': {}", path.display(), e);
    }
}

fn restore_mtime(path: &Path, metadata: &fs::Metadata) {
    let mtime = filetime::FileTime::from_last_modification_time(metadata);
    if let Err(e) = filetime::set_file_mtime(path, mtime) {
        log::warn!("Could not restore mtime on '{}': {}", path.display(), e);
    }
}
