//! Discovery of existing hard-link clusters.
//!
//! In discovery mode every file with more than one link is chained by its
//! physical identity instead of its content. Each identity chain is then one
//! cluster: the names found in the scanned tree, plus the link count the
//! filesystem reports (which may include names outside the tree).

use std::path::PathBuf;

use serde::Serialize;

use super::groups::{GroupKey, SignatureIndex};
use crate::scanner::FileId;

/// Names of one physical file found during a discovery scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HardlinkGroup {
    /// Volume and file index shared by every member.
    pub id: FileId,
    /// Link count reported by the filesystem (largest observed).
    pub total_links: u64,
    /// Member paths in scan order.
    pub paths: Vec<PathBuf>,
}

impl HardlinkGroup {
    /// Number of names found inside the scanned tree.
    #[must_use]
    pub fn found(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if some names live outside the scanned tree.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.total_links > self.found() as u64
    }
}

/// Collect every identity chain worth reporting, in key order.
///
/// A chain is reported when more than one member was found, or when the
/// filesystem knows of more links than were found. A lone name with links
/// outside the scanned paths is therefore listed too, so every file with
/// extra names shows up.
#[must_use]
pub fn collect_hardlink_groups(index: &SignatureIndex<GroupKey>) -> Vec<HardlinkGroup> {
    index
        .chains()
        .filter_map(|(key, ids)| {
            let GroupKey::Identity(id) = *key else {
                return None;
            };
            let members: Vec<_> = ids.iter().filter_map(|&i| index.get(i)).collect();
            let total_links = members
                .iter()
                .map(|r| r.identity.links)
                .max()
                .unwrap_or(0);
            let group = HardlinkGroup {
                id,
                total_links,
                paths: members.iter().map(|r| r.path.clone()).collect(),
            };
            (group.found() > 1 || group.is_partial()).then_some(group)
        })
        .collect()
}
