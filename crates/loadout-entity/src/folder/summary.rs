//! Operation summaries returned by delete and duplicate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::model::FolderNode;

/// Counts reported by a folder delete.
///
/// `folders_deleted` includes the deleted folder itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSummary {
    /// Folders removed, the target included.
    pub folders_deleted: u64,
    /// Unprotected leaves removed.
    #[serde(alias = "leavesDeleted")]
    pub loadouts_deleted: u64,
    /// Protected leaves relocated to the deleted folder's parent.
    #[serde(alias = "protectedLeavesMoved")]
    pub protected_loadouts_moved: u64,
}

/// Result of duplicating a folder subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateFolderSummary {
    /// The cloned subtree, already attached under the original's parent.
    pub folder: Arc<FolderNode>,
    /// Folders created, the top clone included.
    pub folders_copied: u64,
    /// Leaves created.
    pub leaves_copied: u64,
}
