//! Prefix signature used to pre-filter duplicate candidates.
//!
//! # Overview
//!
//! The signature is a 64-bit value made of a shift-register checksum and a
//! rotating sum over (at most) the first [`SIGNATURE_WINDOW`] bytes of a
//! file. The file length is folded into the sum afterwards, so files with an
//! identical prefix but different lengths land in different buckets.
//!
//! A signature match is never proof of equality: files that differ only
//! after the window, or plain collisions, must still be byte-compared.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use super::ReadError;

/// Number of leading bytes that contribute to a signature.
pub const SIGNATURE_WINDOW: usize = 32 * 1024;

/// Cheap content signature: checksum register plus rolling sum.
///
/// Ordering is lexicographic on `(crc, sum)`; the grouping structure relies
/// on it being total and deterministic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Signature {
    /// Shift-register checksum.
    pub crc: u32,
    /// Rotating sum, folded with the file length.
    pub sum: u32,
}

impl Signature {
    /// Feed bytes into the signature.
    pub fn update(&mut self, data: &[u8]) {
        let mut reg = self.crc;
        let mut sum = self.sum;
        for &byte in data {
            let b = u32::from(byte);
            reg ^= b;
            sum = sum.wrapping_add(b);
            reg = (reg >> 8) ^ ((reg & 0xff) << 24) ^ ((reg & 0xff) << 9);
            sum = (sum << 1).wrapping_add(sum >> 31);
        }
        self.crc = reg;
        self.sum = sum;
    }

    /// Fold the file length into the rolling sum (truncated to 32 bits).
    pub fn fold_length(&mut self, size: u64) {
        self.sum = self.sum.wrapping_add(size as u32);
    }

    /// Signature of an in-memory prefix belonging to a file of `size` bytes.
    #[must_use]
    pub fn of_prefix(prefix: &[u8], size: u64) -> Self {
        let mut sig = Self::default();
        sig.update(prefix);
        sig.fold_length(size);
        sig
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}{:08x}", self.crc, self.sum)
    }
}

/// Compute the signature and size of the file at `path`.
///
/// Reads at most [`SIGNATURE_WINDOW`] bytes. The handle is closed before
/// returning on every path.
///
/// # Errors
///
/// Returns [`ReadError`] if the file cannot be opened or stat'ed, or if the
/// prefix comes back shorter than the size reported by the filesystem.
pub fn compute_signature(path: &Path) -> Result<(Signature, u64), ReadError> {
    let file = File::open(path).map_err(|e| ReadError::from_io(path, e))?;
    let size = file
        .metadata()
        .map_err(|e| ReadError::from_io(path, e))?
        .len();

    let expected = usize::try_from(size)
        .unwrap_or(usize::MAX)
        .min(SIGNATURE_WINDOW);
    let mut prefix = Vec::with_capacity(expected);
    file.take(expected as u64)
        .read_to_end(&mut prefix)
        .map_err(|e| ReadError::from_io(path, e))?;

    if prefix.len() != expected {
        return Err(ReadError::ShortRead {
            path: path.to_path_buf(),
            expected,
            actual: prefix.len(),
        });
    }

    let signature = Signature::of_prefix(&prefix, size);
    log::trace!("{} {:>10} {}", signature, size, path.display());
    Ok((signature, size))
}
