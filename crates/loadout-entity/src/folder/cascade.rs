//! Subtree-wide transforms: cascading delete and deep clone.
//!
//! Both backends and the coordinator's optimistic path run these same
//! functions, so protected-leaf rescue and id assignment look identical
//! wherever they happen.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use loadout_core::types::{FolderId, LeafId};

use super::model::FolderNode;
use super::summary::DeleteSummary;
use super::tree::{
    find_folder, find_folder_arc, replace_folder_leaves, with_folder_inserted,
    with_folder_removed,
};
use crate::leaf::{LeafSummary, copy_name};

/// Result of [`cascade_delete`].
#[derive(Debug, Clone)]
pub struct CascadeDelete {
    /// The tree with the subtree removed and protected leaves rescued.
    pub tree: Arc<FolderNode>,
    /// Counts for the caller.
    pub summary: DeleteSummary,
    /// The surviving parent that received the protected leaves.
    pub parent_id: FolderId,
    /// Removed folders, the target first.
    pub deleted_folder_ids: Vec<FolderId>,
    /// Removed unprotected leaves.
    pub deleted_leaf_ids: Vec<LeafId>,
    /// Protected leaves now listed under `parent_id`.
    pub rescued_leaf_ids: Vec<LeafId>,
}

/// Delete a folder subtree, relocating protected leaves to its parent.
///
/// Walks the subtree once in pre-order. Rescued leaves are appended to the
/// parent's listing in that order with `updated_at` set to `now`. Returns
/// `None` for an absent folder or the root.
pub fn cascade_delete(
    tree: &Arc<FolderNode>,
    folder_id: FolderId,
    now: DateTime<Utc>,
) -> Option<CascadeDelete> {
    let target = find_folder(tree, folder_id)?;
    let parent_id = target.parent_id?;

    let mut deleted_folder_ids = Vec::new();
    let mut deleted_leaf_ids = Vec::new();
    let mut rescued = Vec::new();
    collect_subtree(target, &mut deleted_folder_ids, &mut deleted_leaf_ids, &mut rescued);

    for leaf in &mut rescued {
        leaf.updated_at = now;
    }
    let rescued_leaf_ids: Vec<LeafId> = rescued.iter().map(|l| l.id).collect();

    let pruned = with_folder_removed(tree, folder_id);
    let tree = replace_folder_leaves(&pruned, parent_id, |leaves| {
        leaves.extend(rescued.iter().cloned());
    });

    let summary = DeleteSummary {
        folders_deleted: deleted_folder_ids.len() as u64,
        loadouts_deleted: deleted_leaf_ids.len() as u64,
        protected_loadouts_moved: rescued_leaf_ids.len() as u64,
    };

    Some(CascadeDelete {
        tree,
        summary,
        parent_id,
        deleted_folder_ids,
        deleted_leaf_ids,
        rescued_leaf_ids,
    })
}

fn collect_subtree(
    folder: &FolderNode,
    folders: &mut Vec<FolderId>,
    leaves: &mut Vec<LeafId>,
    rescued: &mut Vec<LeafSummary>,
) {
    folders.push(folder.id);
    for leaf in &folder.leaves {
        if leaf.is_protected {
            rescued.push(leaf.clone());
        } else {
            leaves.push(leaf.id);
        }
    }
    for child in &folder.children {
        collect_subtree(child, folders, leaves, rescued);
    }
}

/// Result of [`clone_subtree`].
#[derive(Debug, Clone)]
pub struct ClonedSubtree {
    /// The tree with the clone appended under the original's parent.
    pub tree: Arc<FolderNode>,
    /// The cloned subtree.
    pub folder: Arc<FolderNode>,
    /// `(original, copy)` for every cloned leaf, in allocation order.
    pub leaf_ids: Vec<(LeafId, LeafId)>,
    /// Folders created, the top clone included.
    pub folders_copied: u64,
    /// Leaves created.
    pub leaves_copied: u64,
}

/// Deep-clone a folder subtree next to the original.
///
/// Ids come from `next_id` in pre-order: a folder's id is drawn before its
/// leaves, and its leaves before its child folders, so every `parent_id` in
/// the clone refers to an id that was already allocated. The top clone is
/// renamed with a copy suffix; read-only flags and leaf protection are
/// cleared throughout. Returns `None` for an absent folder or the root.
pub fn clone_subtree<F>(
    tree: &Arc<FolderNode>,
    folder_id: FolderId,
    next_id: &mut F,
    now: DateTime<Utc>,
) -> Option<ClonedSubtree>
where
    F: FnMut() -> i64,
{
    let source = find_folder_arc(tree, folder_id)?;
    let parent_id = source.parent_id?;

    let mut leaf_ids = Vec::new();
    let mut folders_copied = 0;
    let mut clone = clone_node(
        &source,
        parent_id,
        next_id,
        now,
        &mut leaf_ids,
        &mut folders_copied,
    );
    clone.name = copy_name(&source.name);

    let folder = Arc::new(clone);
    let tree = with_folder_inserted(tree, parent_id, Arc::clone(&folder));
    let leaves_copied = leaf_ids.len() as u64;

    Some(ClonedSubtree {
        tree,
        folder,
        leaf_ids,
        folders_copied,
        leaves_copied,
    })
}

fn clone_node<F>(
    source: &FolderNode,
    parent_id: FolderId,
    next_id: &mut F,
    now: DateTime<Utc>,
    leaf_ids: &mut Vec<(LeafId, LeafId)>,
    folders_copied: &mut u64,
) -> FolderNode
where
    F: FnMut() -> i64,
{
    let id = FolderId(next_id());
    *folders_copied += 1;

    let leaves = source
        .leaves
        .iter()
        .map(|leaf| {
            let copy_id = LeafId(next_id());
            leaf_ids.push((leaf.id, copy_id));
            LeafSummary {
                id: copy_id,
                name: leaf.name.clone(),
                updated_at: now,
                is_protected: false,
            }
        })
        .collect();

    let children = source
        .children
        .iter()
        .map(|child| Arc::new(clone_node(child, id, next_id, now, leaf_ids, folders_copied)))
        .collect();

    FolderNode {
        id,
        name: source.name.clone(),
        parent_id: Some(parent_id),
        is_read_only: false,
        children,
        leaves,
    }
}
