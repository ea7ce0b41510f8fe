//! Byte-exact verification of signature matches.
//!
//! A signature match only says two files are worth comparing. The
//! [`Verifier`] settles it: equal physical files are recognised from their
//! identity, everything else is compared chunk by chunk. Any doubt (an open
//! failure, a short read) resolves to [`Verdict::DistinctCollision`] so that
//! nothing is ever eliminated on unverified data.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use super::groups::FileRecord;

/// Chunk size used for content comparison.
pub const COMPARE_CHUNK: usize = 64 * 1024;

/// Result of comparing a candidate against an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Contents are identical.
    Duplicate {
        /// Both paths already name the same physical file.
        already_linked: bool,
    },
    /// Same signature, different content (or unverifiable).
    DistinctCollision,
}

impl Verdict {
    /// Returns `true` for either kind of duplicate.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// Reusable content comparer.
#[derive(Debug)]
pub struct Verifier {
    left: Vec<u8>,
    right: Vec<u8>,
    byte_comparisons: u64,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Verifier {
    /// Create a verifier with two comparison buffers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            left: vec![0; COMPARE_CHUNK],
            right: vec![0; COMPARE_CHUNK],
            byte_comparisons: 0,
        }
    }

    /// Number of content comparisons started so far.
    #[must_use]
    pub fn byte_comparisons(&self) -> u64 {
        self.byte_comparisons
    }

    /// Decide whether `candidate` duplicates `existing`.
    pub fn verify(&mut self, candidate: &FileRecord, existing: &FileRecord) -> Verdict {
        if candidate.size != existing.size {
            return Verdict::DistinctCollision;
        }
        if candidate.identity.same_file(&existing.identity) {
            return Verdict::Duplicate {
                already_linked: true,
            };
        }

        self.byte_comparisons += 1;
        match self.compare_contents(&candidate.path, &existing.path, candidate.size) {
            Ok(true) => Verdict::Duplicate {
                already_linked: false,
            },
            Ok(false) => Verdict::DistinctCollision,
            Err(e) => {
                log::warn!(
                    "Could not compare {} with {}: {}",
                    candidate.path.display(),
                    existing.path.display(),
                    e
                );
                Verdict::DistinctCollision
            }
        }
    }

    fn compare_contents(&mut self, a: &Path, b: &Path, size: u64) -> io::Result<bool> {
        let mut file_a = File::open(a)?;
        let mut file_b = File::open(b)?;

        let mut remaining = size;
        while remaining > 0 {
            let want = usize::try_from(remaining).map_or(COMPARE_CHUNK, |r| r.min(COMPARE_CHUNK));
            let got_a = read_full(&mut file_a, &mut self.left[..want])?;
            let got_b = read_full(&mut file_b, &mut self.right[..want])?;

            if got_a != want || got_b != want {
                let short = if got_a != want { a } else { b };
                log::error!(
                    "file read problem on {}: expected {} bytes, got {}",
                    short.display(),
                    want,
                    got_a.min(got_b)
                );
                return Ok(false);
            }
            if self.left[..want] != self.right[..want] {
                return Ok(false);
            }
            remaining -= want as u64;
        }
        Ok(true)
    }
}

/// Fill `buf` as far as the reader allows; returns bytes read.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
