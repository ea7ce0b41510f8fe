//! Scanner module for candidate discovery and per-file probing.
//!
//! This module provides functionality for:
//! - Expanding input paths into candidate files (directory traversal)
//! - Computing the cheap 32 KiB prefix signature of a file
//! - Resolving the filesystem identity (volume + file index, link count)
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and candidate enumeration
//! - [`signature`]: Prefix checksum + rolling sum, folded with length
//! - [`identity`]: Platform-specific file identity and link count
//!
//! # Example
//!
//! ```no_run
//! use finddupe::scanner::{compute_signature, resolve_identity, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(path) => {
//!             let (signature, size) = compute_signature(&path).unwrap();
//!             let identity = resolve_identity(&path).unwrap();
//!             println!("{} {:>10} {} links", signature, size, identity.links);
//!         }
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod identity;
pub mod signature;
pub mod walker;

use std::io;
use std::path::{Path, PathBuf};

// Re-export main types
pub use identity::{resolve_identity, FileId, Identity};
pub use signature::{compute_signature, Signature, SIGNATURE_WINDOW};
pub use walker::Walker;

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links (and junctions) during traversal.
    /// Warning: May cause infinite loops with symlink cycles.
    pub follow_links: bool,

    /// Glob patterns to ignore (gitignore-style).
    pub ignore_patterns: Vec<String>,

    /// Paths that are never yielded as candidates (e.g. the script being written).
    pub exclude: Vec<PathBuf>,
}

impl WalkerConfig {
    /// Enable or disable following symbolic links.
    #[must_use]
    pub fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Set the ignore patterns.
    #[must_use]
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Add a path that must never be yielded.
    #[must_use]
    pub fn with_excluded(mut self, path: PathBuf) -> Self {
        self.exclude.push(path);
        self
    }
}

/// Errors that can occur while expanding input paths.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred during traversal.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// A candidate file could not be opened, stat'ed, or read.
///
/// Always recoverable: the file is counted and skipped.
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The file vanished between enumeration and probing.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when opening the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Fewer bytes than expected could be read from the file prefix.
    #[error("file read problem on {path}: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Path of the file
        path: PathBuf,
        /// Bytes requested
        expected: usize,
        /// Bytes actually read
        actual: usize,
    },

    /// Any other I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path of the file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ReadError {
    /// Classify an I/O error for `path`.
    pub(crate) fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path of the file that could not be read.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) => p,
            Self::ShortRead { path, .. } | Self::Io { path, .. } => path,
        }
    }
}
