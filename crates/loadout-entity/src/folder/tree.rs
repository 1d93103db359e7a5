//! Pure queries and copy-on-write transforms over a folder tree.
//!
//! Transforms take the current root and return a new root with exactly one
//! localized change. Nodes off the touched path are shared with the input.
//! A transform whose target id is absent, or whose precondition does not
//! hold, returns the input unchanged; callers that need an error check the
//! precondition first with the queries in this module.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use loadout_core::error::AppError;
use loadout_core::types::{FolderId, ItemType, LeafId};

use super::model::FolderNode;
use crate::leaf::LeafSummary;

// ── Queries ───────────────────────────────────────────────────────

/// Find a folder by id.
pub fn find_folder(tree: &FolderNode, id: FolderId) -> Option<&FolderNode> {
    if tree.id == id {
        return Some(tree);
    }
    tree.children.iter().find_map(|child| find_folder(child, id))
}

/// Find a folder by id, returning its shared handle.
pub fn find_folder_arc(tree: &Arc<FolderNode>, id: FolderId) -> Option<Arc<FolderNode>> {
    if tree.id == id {
        return Some(Arc::clone(tree));
    }
    tree.children
        .iter()
        .find_map(|child| find_folder_arc(child, id))
}

/// Find a leaf summary together with the folder listing it.
pub fn find_leaf_and_parent(
    tree: &FolderNode,
    leaf_id: LeafId,
) -> Option<(&FolderNode, &LeafSummary)> {
    if let Some(leaf) = tree.leaves.iter().find(|l| l.id == leaf_id) {
        return Some((tree, leaf));
    }
    tree.children
        .iter()
        .find_map(|child| find_leaf_and_parent(child, leaf_id))
}

/// All folder ids strictly below `folder_id`. Empty if the folder is absent.
pub fn descendant_ids(tree: &FolderNode, folder_id: FolderId) -> HashSet<FolderId> {
    let mut ids = HashSet::new();
    if let Some(folder) = find_folder(tree, folder_id) {
        collect_descendants(folder, &mut ids);
    }
    ids
}

fn collect_descendants(folder: &FolderNode, ids: &mut HashSet<FolderId>) {
    for child in &folder.children {
        ids.insert(child.id);
        collect_descendants(child, ids);
    }
}

/// Folders from the root down to `folder_id`, both inclusive.
pub fn ancestry(tree: &FolderNode, folder_id: FolderId) -> Option<Vec<&FolderNode>> {
    let mut path = Vec::new();
    if walk_to(tree, folder_id, &mut path) {
        Some(path)
    } else {
        None
    }
}

fn walk_to<'a>(node: &'a FolderNode, id: FolderId, path: &mut Vec<&'a FolderNode>) -> bool {
    path.push(node);
    if node.id == id {
        return true;
    }
    for child in &node.children {
        if walk_to(child, id, path) {
            return true;
        }
    }
    path.pop();
    false
}

/// Folder names from the root to `folder_id`. Empty if the folder is absent.
pub fn path_to(tree: &FolderNode, folder_id: FolderId) -> Vec<String> {
    ancestry(tree, folder_id)
        .map(|path| path.iter().map(|f| f.name.clone()).collect())
        .unwrap_or_default()
}

/// Whether the folder or any ancestor is flagged read-only.
pub fn effective_read_only(tree: &FolderNode, folder_id: FolderId) -> bool {
    ancestry(tree, folder_id)
        .map(|path| path.iter().any(|f| f.is_read_only))
        .unwrap_or(false)
}

/// Whether moving `folder_id` under `target_parent_id` would create a cycle.
pub fn would_create_cycle(
    tree: &FolderNode,
    folder_id: FolderId,
    target_parent_id: FolderId,
) -> bool {
    folder_id == target_parent_id || descendant_ids(tree, folder_id).contains(&target_parent_id)
}

/// Raw ids of a folder's children of one type, in order.
pub fn child_ids(folder: &FolderNode, item_type: ItemType) -> Vec<i64> {
    match item_type {
        ItemType::Folder => folder.children.iter().map(|c| c.id.get()).collect(),
        ItemType::Leaf => folder.leaves.iter().map(|l| l.id.get()).collect(),
    }
}

/// Whether `ordered` holds exactly the ids of `current`, each once.
pub fn is_permutation(current: &[i64], ordered: &[i64]) -> bool {
    if current.len() != ordered.len() {
        return false;
    }
    let mut a = current.to_vec();
    let mut b = ordered.to_vec();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

/// Every folder id in pre-order.
pub fn folder_ids(tree: &FolderNode) -> Vec<FolderId> {
    let mut ids = vec![tree.id];
    for child in &tree.children {
        ids.extend(folder_ids(child));
    }
    ids
}

/// Every leaf id in pre-order.
pub fn leaf_ids(tree: &FolderNode) -> Vec<LeafId> {
    let mut ids: Vec<LeafId> = tree.leaves.iter().map(|l| l.id).collect();
    for child in &tree.children {
        ids.extend(leaf_ids(child));
    }
    ids
}

/// Check the structural invariants of a whole tree.
///
/// The root must use the root sentinel with no parent, every other folder's
/// `parent_id` must name the folder that contains it, and ids must be unique.
pub fn validate(tree: &FolderNode) -> Result<(), AppError> {
    if tree.id != FolderId::ROOT || tree.parent_id.is_some() {
        return Err(AppError::internal("Tree root must be the root sentinel"));
    }
    let mut folders = HashSet::new();
    let mut leaves = HashSet::new();
    validate_node(tree, &mut folders, &mut leaves)
}

fn validate_node(
    node: &FolderNode,
    folders: &mut HashSet<FolderId>,
    leaves: &mut HashSet<LeafId>,
) -> Result<(), AppError> {
    if !folders.insert(node.id) {
        return Err(AppError::internal(format!("Duplicate folder id {}", node.id)));
    }
    for leaf in &node.leaves {
        if !leaves.insert(leaf.id) {
            return Err(AppError::internal(format!("Duplicate leaf id {}", leaf.id)));
        }
    }
    for child in &node.children {
        if child.parent_id != Some(node.id) {
            return Err(AppError::internal(format!(
                "Folder {} is listed under {} but points at {:?}",
                child.id, node.id, child.parent_id
            )));
        }
        validate_node(child, folders, leaves)?;
    }
    Ok(())
}

// ── Transforms ────────────────────────────────────────────────────

/// Rebuild the path to `id`, replacing that folder with `f`'s result.
///
/// Returns `None` when the folder is absent or `f` declines the change.
fn update_folder<F>(node: &Arc<FolderNode>, id: FolderId, f: &mut F) -> Option<Arc<FolderNode>>
where
    F: FnMut(&FolderNode) -> Option<FolderNode>,
{
    if node.id == id {
        return f(node).map(Arc::new);
    }
    for (idx, child) in node.children.iter().enumerate() {
        if let Some(updated) = update_folder(child, id, f) {
            let mut copy = (**node).clone();
            copy.children[idx] = updated;
            return Some(Arc::new(copy));
        }
    }
    None
}

fn replace_folder<F>(tree: &Arc<FolderNode>, id: FolderId, mut f: F) -> Arc<FolderNode>
where
    F: FnMut(&FolderNode) -> Option<FolderNode>,
{
    update_folder(tree, id, &mut f).unwrap_or_else(|| Arc::clone(tree))
}

/// Apply `f` to one folder's leaf listing.
pub(crate) fn replace_folder_leaves<F>(
    tree: &Arc<FolderNode>,
    folder_id: FolderId,
    mut f: F,
) -> Arc<FolderNode>
where
    F: FnMut(&mut Vec<LeafSummary>),
{
    replace_folder(tree, folder_id, |folder| {
        let mut next = folder.clone();
        f(&mut next.leaves);
        Some(next)
    })
}

/// Append a leaf to a folder's listing.
pub fn with_leaf_inserted(
    tree: &Arc<FolderNode>,
    folder_id: FolderId,
    leaf: LeafSummary,
) -> Arc<FolderNode> {
    if find_leaf_and_parent(tree, leaf.id).is_some() {
        return Arc::clone(tree);
    }
    replace_folder(tree, folder_id, |folder| {
        let mut next = folder.clone();
        next.leaves.push(leaf.clone());
        Some(next)
    })
}

/// Remove a leaf from whichever folder lists it.
pub fn with_leaf_removed(tree: &Arc<FolderNode>, leaf_id: LeafId) -> Arc<FolderNode> {
    let Some((parent, _)) = find_leaf_and_parent(tree, leaf_id) else {
        return Arc::clone(tree);
    };
    replace_folder(tree, parent.id, |folder| {
        let mut next = folder.clone();
        next.leaves.retain(|l| l.id != leaf_id);
        Some(next)
    })
}

/// Apply `f` to a leaf's listing entry in place.
pub fn with_leaf_updated<F>(tree: &Arc<FolderNode>, leaf_id: LeafId, mut f: F) -> Arc<FolderNode>
where
    F: FnMut(&mut LeafSummary),
{
    let Some((parent, _)) = find_leaf_and_parent(tree, leaf_id) else {
        return Arc::clone(tree);
    };
    replace_folder(tree, parent.id, |folder| {
        let mut next = folder.clone();
        if let Some(leaf) = next.leaves.iter_mut().find(|l| l.id == leaf_id) {
            f(leaf);
        }
        Some(next)
    })
}

/// Rename a leaf and stamp its modification time.
pub fn with_leaf_renamed(
    tree: &Arc<FolderNode>,
    leaf_id: LeafId,
    name: &str,
    now: DateTime<Utc>,
) -> Arc<FolderNode> {
    with_leaf_updated(tree, leaf_id, |leaf| {
        leaf.name = name.to_string();
        leaf.updated_at = now;
    })
}

/// Move a leaf to the end of another folder's listing.
///
/// Unchanged when either id is absent or the leaf already lives there.
pub fn with_leaf_moved(
    tree: &Arc<FolderNode>,
    leaf_id: LeafId,
    target_folder_id: FolderId,
) -> Arc<FolderNode> {
    let Some((parent, leaf)) = find_leaf_and_parent(tree, leaf_id) else {
        return Arc::clone(tree);
    };
    if parent.id == target_folder_id || find_folder(tree, target_folder_id).is_none() {
        return Arc::clone(tree);
    }
    let leaf = leaf.clone();
    let removed = with_leaf_removed(tree, leaf_id);
    with_leaf_inserted(&removed, target_folder_id, leaf)
}

/// Append a folder under `parent_id`, pointing its `parent_id` there.
pub fn with_folder_inserted(
    tree: &Arc<FolderNode>,
    parent_id: FolderId,
    folder: Arc<FolderNode>,
) -> Arc<FolderNode> {
    if find_folder(tree, folder.id).is_some() {
        return Arc::clone(tree);
    }
    let folder = if folder.parent_id == Some(parent_id) {
        folder
    } else {
        let mut fixed = (*folder).clone();
        fixed.parent_id = Some(parent_id);
        Arc::new(fixed)
    };
    replace_folder(tree, parent_id, |parent| {
        let mut next = parent.clone();
        next.children.push(Arc::clone(&folder));
        Some(next)
    })
}

/// Remove a folder and its whole subtree. The root is never removed.
pub fn with_folder_removed(tree: &Arc<FolderNode>, folder_id: FolderId) -> Arc<FolderNode> {
    let Some(parent_id) = find_folder(tree, folder_id).and_then(|f| f.parent_id) else {
        return Arc::clone(tree);
    };
    replace_folder(tree, parent_id, |parent| {
        let mut next = parent.clone();
        next.children.retain(|c| c.id != folder_id);
        Some(next)
    })
}

/// Rename a folder.
pub fn with_folder_renamed(
    tree: &Arc<FolderNode>,
    folder_id: FolderId,
    name: &str,
) -> Arc<FolderNode> {
    replace_folder(tree, folder_id, |folder| {
        let mut next = folder.clone();
        next.name = name.to_string();
        Some(next)
    })
}

/// Move a folder to the end of another folder's children.
///
/// Unchanged when either id is absent, the folder is the root, it already
/// lives under the target, or the move would create a cycle.
pub fn with_folder_moved(
    tree: &Arc<FolderNode>,
    folder_id: FolderId,
    target_parent_id: FolderId,
) -> Arc<FolderNode> {
    let Some(folder) = find_folder_arc(tree, folder_id) else {
        return Arc::clone(tree);
    };
    if folder.is_root()
        || folder.parent_id == Some(target_parent_id)
        || find_folder(tree, target_parent_id).is_none()
        || would_create_cycle(tree, folder_id, target_parent_id)
    {
        return Arc::clone(tree);
    }
    let removed = with_folder_removed(tree, folder_id);
    with_folder_inserted(&removed, target_parent_id, folder)
}

/// Set the read-only flag on one folder.
pub fn with_read_only(tree: &Arc<FolderNode>, folder_id: FolderId, value: bool) -> Arc<FolderNode> {
    replace_folder(tree, folder_id, |folder| {
        if folder.is_read_only == value {
            return None;
        }
        let mut next = folder.clone();
        next.is_read_only = value;
        Some(next)
    })
}

/// Reorder one child sequence of a folder.
///
/// Unchanged unless `ordered_ids` is a permutation of the current children
/// of that type.
pub fn with_child_order(
    tree: &Arc<FolderNode>,
    folder_id: FolderId,
    item_type: ItemType,
    ordered_ids: &[i64],
) -> Arc<FolderNode> {
    replace_folder(tree, folder_id, |folder| {
        if !is_permutation(&child_ids(folder, item_type), ordered_ids) {
            return None;
        }
        let mut next = folder.clone();
        match item_type {
            ItemType::Folder => {
                next.children = ordered_ids
                    .iter()
                    .filter_map(|id| folder.children.iter().find(|c| c.id.get() == *id))
                    .cloned()
                    .collect();
            }
            ItemType::Leaf => {
                next.leaves = ordered_ids
                    .iter()
                    .filter_map(|id| folder.leaves.iter().find(|l| l.id.get() == *id))
                    .cloned()
                    .collect();
            }
        }
        Some(next)
    })
}
