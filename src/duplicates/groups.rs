//! Signature-keyed grouping of file records.
//!
//! # Overview
//!
//! [`SignatureIndex`] is an ordered map from a grouping key to a chain of
//! records that share it. Records live in an append-only arena and are
//! addressed by [`RecordId`], so ids stay valid for the whole run.
//!
//! Distinct keys are kept apart for `O(log n)` lookup; only records in the
//! same chain are ever compared to each other.
//!
//! # Example
//!
//! ```
//! use finddupe::duplicates::groups::{FileRecord, GroupKey, Placement, Resolution, SignatureIndex};
//! use finddupe::scanner::{Identity, Signature};
//! use std::path::PathBuf;
//!
//! let sig = Signature::of_prefix(b"hello", 5);
//! let record = |name: &str| FileRecord::new(PathBuf::from(name), 5, sig, Identity::default());
//!
//! let mut index = SignatureIndex::new();
//! assert!(matches!(index.append(GroupKey::Content(sig), record("a")), Placement::StoredAsNew(_)));
//!
//! // A resolver that refutes every pair chains the second record.
//! let placed = index
//!     .insert_with(GroupKey::Content(sig), record("b"), |_, _| Ok::<_, ()>(Resolution::Continue))
//!     .unwrap();
//! assert!(matches!(placed, Placement::MergedIntoChain { .. }));
//! assert_eq!(index.len(), 2);
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::scanner::{FileId, Identity, Signature};

/// Stable index of a record in the arena.
pub type RecordId = usize;

/// One probed file retained by the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Path at observation time.
    pub path: PathBuf,
    /// Length in bytes.
    pub size: u64,
    /// Prefix signature (pre-filter only).
    pub signature: Signature,
    /// Volume, file index and link count.
    pub identity: Identity,
}

impl FileRecord {
    /// Create a new record.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, signature: Signature, identity: Identity) -> Self {
        Self {
            path,
            size,
            signature,
            identity,
        }
    }
}

/// What a chain is keyed by.
///
/// Content keys group by signature; identity keys group by physical file and
/// are used when discovering existing hard links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    /// Prefix signature of the content.
    Content(Signature),
    /// Volume and file index.
    Identity(FileId),
}

/// Decision returned by an insertion resolver for one chain member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The candidate was consumed; it must not be stored.
    Absorbed,
    /// Try the next member, storing the candidate if the chain runs out.
    Continue,
}

/// Where an inserted record ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// First record with this key; a new chain was started.
    StoredAsNew(RecordId),
    /// The resolver absorbed the candidate against this existing record.
    MergedAsDuplicateOf(RecordId),
    /// Appended to an existing chain.
    MergedIntoChain {
        /// First record of the chain.
        head: RecordId,
        /// Id of the newly stored record.
        id: RecordId,
    },
}

impl Placement {
    /// Id of the stored record, if the candidate was stored.
    #[must_use]
    pub fn stored_id(&self) -> Option<RecordId> {
        match *self {
            Self::StoredAsNew(id) | Self::MergedIntoChain { id, .. } => Some(id),
            Self::MergedAsDuplicateOf(_) => None,
        }
    }
}

/// Ordered map from key to an append-only chain of records.
#[derive(Debug, Clone)]
pub struct SignatureIndex<K = GroupKey> {
    records: Vec<FileRecord>,
    chains: BTreeMap<K, Vec<RecordId>>,
}

impl<K: Ord> Default for SignatureIndex<K> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            chains: BTreeMap::new(),
        }
    }
}

impl<K: Ord> SignatureIndex<K> {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no record has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    /// Record by id.
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<&FileRecord> {
        self.records.get(id)
    }

    /// All stored records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    /// Ids in the chain for `key`, in insertion order.
    #[must_use]
    pub fn chain(&self, key: &K) -> &[RecordId] {
        self.chains.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate chains in key order.
    pub fn chains(&self) -> impl Iterator<Item = (&K, &[RecordId])> + '_ {
        self.chains.iter().map(|(k, ids)| (k, ids.as_slice()))
    }

    /// Store `record` at the end of its chain without any comparison.
    pub fn append(&mut self, key: K, record: FileRecord) -> Placement {
        let id = self.records.len();
        self.records.push(record);
        let chain = self.chains.entry(key).or_default();
        chain.push(id);
        if chain.len() == 1 {
            Placement::StoredAsNew(id)
        } else {
            Placement::MergedIntoChain { head: chain[0], id }
        }
    }

    /// Place `record`, consulting `resolve` for every chain member in turn.
    ///
    /// `resolve(candidate, existing)` may update the existing record (a link
    /// count, for instance). The first [`Resolution::Absorbed`] ends the walk
    /// and the candidate is dropped; otherwise it is appended.
    ///
    /// # Errors
    ///
    /// Propagates the first resolver error; the index is left unchanged.
    pub fn insert_with<E, F>(
        &mut self,
        key: K,
        record: FileRecord,
        mut resolve: F,
    ) -> Result<Placement, E>
    where
        F: FnMut(&FileRecord, &mut FileRecord) -> Result<Resolution, E>,
    {
        if let Some(ids) = self.chains.get(&key) {
            for &id in ids {
                if resolve(&record, &mut self.records[id])? == Resolution::Absorbed {
                    return Ok(Placement::MergedAsDuplicateOf(id));
                }
            }
        }
        Ok(self.append(key, record))
    }
}
