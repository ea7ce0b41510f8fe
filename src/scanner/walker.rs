//! Candidate enumeration using walkdir.
//!
//! # Overview
//!
//! [`Walker`] expands one input path into a lazy sequence of regular files.
//! A file argument yields itself; a directory yields every regular file
//! below it, children sorted by name so repeated runs see the same order.
//!
//! # Features
//!
//! - Optional symlink following (walkdir detects cycles)
//! - Gitignore-style pattern matching via the `ignore` crate
//! - Exclusion of specific paths, such as the script being written
//!
//! # Example
//!
//! ```no_run
//! use finddupe::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig::default().with_ignore_patterns(vec!["*.tmp".into()]);
//! let walker = Walker::new(Path::new("/home/user/Photos"), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(path) => println!("{}", path.display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use walkdir::WalkDir;

use super::{ScanError, WalkerConfig};

/// Lazy, deterministic enumeration of candidate files under one root.
#[derive(Debug)]
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
    /// Canonical forms of `config.exclude`, resolved when available.
    excluded: Vec<PathBuf>,
}

impl Walker {
    /// Create a walker for `path`.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        let excluded = config
            .exclude
            .iter()
            .map(|p| p.canonicalize().unwrap_or_else(|_| p.clone()))
            .collect();
        Self {
            root: path.to_path_buf(),
            config,
            excluded,
        }
    }

    /// Build the gitignore matcher from configured patterns.
    fn build_gitignore(&self) -> Option<Gitignore> {
        if self.config.ignore_patterns.is_empty() {
            return None;
        }

        let base = if self.root.is_dir() {
            self.root.as_path()
        } else {
            self.root.parent().unwrap_or(Path::new(""))
        };
        let mut builder = GitignoreBuilder::new(base);
        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if !gitignore.is_empty() => Some(gitignore),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    /// Directories are checked before descent, so matching a path against
    /// its own name is enough to honour directory patterns.
    fn should_ignore(gitignore: Option<&Gitignore>, path: &Path, is_dir: bool) -> bool {
        let Some(gi) = gitignore else {
            return false;
        };
        let relative = path.strip_prefix(gi.path()).unwrap_or(path);
        let normalized = if cfg!(windows) {
            relative.to_string_lossy().replace('\\', "/")
        } else {
            relative.to_string_lossy().into_owned()
        };
        gi.matched(normalized, is_dir).is_ignore()
    }

    fn is_excluded(&self, path: &Path) -> bool {
        if self.excluded.is_empty() {
            return false;
        }
        let name = path.file_name();
        self.excluded.iter().any(|excluded| {
            if excluded.file_name() != name {
                return false;
            }
            excluded == path
                || path
                    .canonicalize()
                    .is_ok_and(|canonical| &canonical == excluded)
        })
    }

    /// Walk the tree, yielding candidate file paths.
    ///
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration.
    pub fn walk(&self) -> impl Iterator<Item = Result<PathBuf, ScanError>> + '_ {
        let gitignore = self.build_gitignore();

        WalkDir::new(&self.root)
            .follow_links(self.config.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                let ignored = entry.depth() > 0
                    && Self::should_ignore(
                        gitignore.as_ref(),
                        entry.path(),
                        entry.file_type().is_dir(),
                    );
                if ignored {
                    log::trace!("Ignoring: {}", entry.path().display());
                }
                !ignored
            })
            .filter_map(move |entry| match entry {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    if file_type.is_dir() {
                        return None;
                    }
                    if file_type.is_symlink() {
                        // With follow_links, walkdir reports the target's type;
                        // a remaining symlink is dangling or not followed.
                        log::trace!("Skipping symlink: {}", entry.path().display());
                        return None;
                    }
                    if !file_type.is_file() {
                        return None;
                    }
                    if self.is_excluded(entry.path()) {
                        log::debug!("Skipping excluded path: {}", entry.path().display());
                        return None;
                    }
                    Some(Ok(entry.into_path()))
                }
                Err(e) => Some(Err(self.handle_walk_error(e))),
            })
    }

    fn handle_walk_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        if let Some(ancestor) = error.loop_ancestor() {
            log::warn!(
                "Symlink loop at {} (points to {})",
                path.display(),
                ancestor.display()
            );
            return ScanError::Io {
                path,
                source: std::io::Error::other("filesystem loop detected"),
            };
        }

        match error.into_io_error() {
            Some(io) => handle_io_error(path, io),
            None => ScanError::Io {
                path,
                source: std::io::Error::other("walk error"),
            },
        }
    }
}

fn handle_io_error(path: PathBuf, error: std::io::Error) -> ScanError {
    use std::io::ErrorKind;

    match error.kind() {
        ErrorKind::PermissionDenied => {
            log::warn!("Permission denied: {}", path.display());
            ScanError::PermissionDenied(path)
        }
        ErrorKind::NotFound => {
            log::debug!("Path not found: {}", path.display());
            ScanError::NotFound(path)
        }
        _ => {
            log::warn!("I/O error for {}: {}", path.display(), error);
            ScanError::Io {
                path,
                source: error,
            }
        }
    }
}
