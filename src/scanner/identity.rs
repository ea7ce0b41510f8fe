//! Filesystem identity resolution.
//!
//! # Overview
//!
//! Two paths refer to the same physical file when they share a volume and a
//! file index. This module exposes that pair together with the link count
//! observed at probe time, so the engine can recognise existing hard links
//! without reading any content.
//!
//! # Platform Support
//!
//! - **Unix**: `(st_dev, st_ino)` and `st_nlink` from file metadata
//! - **Windows**: volume serial number, 64-bit file index and
//!   `nNumberOfLinks` via `GetFileInformationByHandle`
//! - **Other**: a zero link count, which disables identity matching

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use super::ReadError;

/// Volume plus file index; equal iff two paths share data on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FileId {
    /// Device id (Unix) or volume serial number (Windows).
    pub volume: u64,
    /// Inode number (Unix) or file index (Windows).
    pub index: u64,
}

/// Strong identity of a file at observation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Volume and file index.
    pub id: FileId,
    /// Number of directory entries pointing at the file. Zero means unknown.
    pub links: u64,
}

impl Identity {
    /// Returns `true` if both identities are known and name the same file.
    #[must_use]
    pub fn same_file(&self, other: &Identity) -> bool {
        self.links != 0 && other.links != 0 && self.id == other.id
    }

    /// Returns `true` if both files live on the same volume.
    #[must_use]
    pub fn same_volume(&self, other: &Identity) -> bool {
        self.id.volume == other.id.volume
    }
}

/// Resolve the identity of the file at `path`.
///
/// # Errors
///
/// Returns [`ReadError`] if the file cannot be opened or queried.
pub fn resolve_identity(path: &Path) -> Result<Identity, ReadError> {
    let file = File::open(path).map_err(|e| ReadError::from_io(path, e))?;
    identity_of(&file).map_err(|e| ReadError::from_io(path, e))
}

#[cfg(unix)]
fn identity_of(file: &File) -> std::io::Result<Identity> {
    use std::os::unix::fs::MetadataExt;

    let metadata = file.metadata()?;
    Ok(Identity {
        id: FileId {
            volume: metadata.dev(),
            index: metadata.ino(),
        },
        links: metadata.nlink(),
    })
}

#[cfg(windows)]
fn identity_of(file: &File) -> std::io::Result<Identity> {
    use std::os::windows::io::AsRawHandle;
    use winapi::um::fileapi::{GetFileInformationByHandle, BY_HANDLE_FILE_INFORMATION};
    use winapi::um::winnt::HANDLE;

    // SAFETY: the handle is owned by `file` and stays open for the call;
    // `info` is plain old data that the call fully initialises on success.
    let info = unsafe {
        let mut info: BY_HANDLE_FILE_INFORMATION = std::mem::zeroed();
        if GetFileInformationByHandle(file.as_raw_handle() as HANDLE, &mut info) == 0 {
            return Err(std::io::Error::last_os_error());
        }
        info
    };

    Ok(Identity {
        id: FileId {
            volume: u64::from(info.dwVolumeSerialNumber),
            index: (u64::from(info.nFileIndexHigh) << 32) | u64::from(info.nFileIndexLow),
        },
        links: u64::from(info.nNumberOfLinks),
    })
}

#[cfg(not(any(unix, windows)))]
fn identity_of(file: &File) -> std::io::Result<Identity> {
    file.metadata()?;
    Ok(Identity::default())
}
