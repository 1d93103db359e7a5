//! The persisted local record and the contract semantics applied to it.
//!
//! Every operation here is synchronous and works on a `&mut LocalRecord`;
//! [`super::LocalTreeBackend`] decides when a changed record is persisted.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use loadout_core::error::AppError;
use loadout_core::result::AppResult;
use loadout_core::types::{FolderId, ItemType, LeafId};
use loadout_entity::folder::tree;
use loadout_entity::folder::{cascade_delete, clone_subtree, normalize_name};
use loadout_entity::leaf::copy_name;
use loadout_entity::{
    DeleteSummary, DuplicateFolderSummary, FolderNode, LeafRecord, LeafSummary, Payload,
};

/// First id handed out by a fresh record.
pub const FIRST_LOCAL_ID: i64 = -1;

/// `{folderTree, leafRecordsById, nextId}` as stored under the record key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRecord {
    /// The whole folder tree.
    pub folder_tree: Arc<FolderNode>,
    /// Full leaf records.
    pub leaf_records_by_id: BTreeMap<LeafId, LeafRecord>,
    /// Next id to allocate; always negative and decreasing.
    pub next_id: i64,
}

impl Default for LocalRecord {
    fn default() -> Self {
        Self::fresh()
    }
}

impl LocalRecord {
    /// An empty tree with nothing allocated.
    pub fn fresh() -> Self {
        Self {
            folder_tree: Arc::new(FolderNode::default()),
            leaf_records_by_id: BTreeMap::new(),
            next_id: FIRST_LOCAL_ID,
        }
    }

    /// Hand out the next local id.
    pub fn allocate(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id -= 1;
        id
    }

    /// Check that the record is internally consistent.
    ///
    /// Beyond the tree invariants, every listed leaf must have a record whose
    /// `folder_id` is the listing folder, no record may be unlisted, and
    /// `next_id` must lie below every local id in use.
    pub fn validate(&self) -> AppResult<()> {
        tree::validate(&self.folder_tree)?;

        if self.next_id >= 0 {
            return Err(AppError::internal("nextId must be negative"));
        }

        let listed = tree::leaf_ids(&self.folder_tree);
        if listed.len() != self.leaf_records_by_id.len() {
            return Err(AppError::internal("Leaf listings and leaf records disagree"));
        }
        for id in listed {
            let record = self
                .leaf_records_by_id
                .get(&id)
                .ok_or_else(|| AppError::internal(format!("Leaf {id} has no record")))?;
            let listed_in = tree::find_leaf_and_parent(&self.folder_tree, id).map(|(f, _)| f.id);
            if listed_in != Some(record.folder_id) {
                return Err(AppError::internal(format!(
                    "Leaf {id} record points at folder {}",
                    record.folder_id
                )));
            }
        }

        let lowest = tree::folder_ids(&self.folder_tree)
            .into_iter()
            .map(FolderId::get)
            .chain(self.leaf_records_by_id.keys().map(|id| id.get()))
            .min()
            .unwrap_or(0);
        if self.next_id >= lowest && lowest < 0 {
            return Err(AppError::internal("nextId overlaps allocated ids"));
        }
        Ok(())
    }

    // ── Lookups ──────────────────────────────────────────────────

    fn folder(&self, id: FolderId) -> AppResult<&FolderNode> {
        tree::find_folder(&self.folder_tree, id)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))
    }

    /// A leaf record by id.
    pub fn leaf(&self, id: LeafId) -> AppResult<&LeafRecord> {
        self.leaf_records_by_id
            .get(&id)
            .ok_or_else(|| AppError::not_found(format!("Loadout {id} not found")))
    }

    fn leaf_mut(&mut self, id: LeafId) -> AppResult<&mut LeafRecord> {
        self.leaf_records_by_id
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Loadout {id} not found")))
    }

    /// Copy a record's listing fields back into the tree.
    fn sync_summary(&mut self, id: LeafId) -> AppResult<()> {
        let summary = self.leaf(id)?.summary();
        self.folder_tree = tree::with_leaf_updated(&self.folder_tree, id, |leaf| {
            *leaf = summary.clone();
        });
        Ok(())
    }

    // ── Folders ──────────────────────────────────────────────────

    /// Create an empty folder under `parent_id`.
    pub fn create_folder(&mut self, name: &str, parent_id: FolderId) -> AppResult<FolderId> {
        let name = normalize_name(name)?;
        self.folder(parent_id)?;
        let id = FolderId(self.allocate());
        let folder = Arc::new(FolderNode::new(id, name, parent_id));
        self.folder_tree = tree::with_folder_inserted(&self.folder_tree, parent_id, folder);
        Ok(id)
    }

    /// Rename a folder. The root keeps its name.
    pub fn rename_folder(&mut self, id: FolderId, name: &str) -> AppResult<()> {
        let name = normalize_name(name)?;
        if self.folder(id)?.is_root() {
            return Err(AppError::invalid_move("The root folder cannot be renamed"));
        }
        self.folder_tree = tree::with_folder_renamed(&self.folder_tree, id, &name);
        Ok(())
    }

    /// Move a folder under another folder.
    ///
    /// Moving into its current parent is accepted and keeps its position.
    pub fn move_folder(&mut self, id: FolderId, target_parent_id: FolderId) -> AppResult<()> {
        let folder = self.folder(id)?;
        self.folder(target_parent_id)?;
        if folder.is_root() {
            return Err(AppError::invalid_move("The root folder cannot be moved"));
        }
        if tree::would_create_cycle(&self.folder_tree, id, target_parent_id) {
            return Err(AppError::invalid_move(format!(
                "Folder {id} cannot be moved into itself or one of its subfolders"
            )));
        }
        self.folder_tree = tree::with_folder_moved(&self.folder_tree, id, target_parent_id);
        Ok(())
    }

    /// Set a folder's own read-only flag.
    pub fn set_read_only(&mut self, id: FolderId, value: bool) -> AppResult<()> {
        self.folder(id)?;
        self.folder_tree = tree::with_read_only(&self.folder_tree, id, value);
        Ok(())
    }

    /// Delete a folder subtree, rescuing protected leaves into its parent.
    pub fn delete_folder(
        &mut self,
        id: FolderId,
        force: bool,
        now: DateTime<Utc>,
    ) -> AppResult<DeleteSummary> {
        let folder = self.folder(id)?;
        if folder.is_root() {
            return Err(AppError::invalid_move("The root folder cannot be deleted"));
        }
        if folder.has_children() && !force {
            return Err(AppError::not_empty(format!(
                "Folder {id} has contents; delete with force to remove them"
            )));
        }

        let cascade = cascade_delete(&self.folder_tree, id, now)
            .ok_or_else(|| AppError::internal(format!("Folder {id} vanished during delete")))?;

        for leaf_id in &cascade.deleted_leaf_ids {
            self.leaf_records_by_id.remove(leaf_id);
        }
        for leaf_id in &cascade.rescued_leaf_ids {
            let record = self.leaf_mut(*leaf_id)?;
            record.folder_id = cascade.parent_id;
            record.updated_at = now;
        }
        self.folder_tree = cascade.tree;
        Ok(cascade.summary)
    }

    /// Deep-copy a folder subtree next to the original.
    pub fn duplicate_folder(
        &mut self,
        id: FolderId,
        now: DateTime<Utc>,
    ) -> AppResult<DuplicateFolderSummary> {
        if self.folder(id)?.is_root() {
            return Err(AppError::invalid_move("The root folder cannot be duplicated"));
        }

        let mut next_id = self.next_id;
        let mut allocate = || {
            let id = next_id;
            next_id -= 1;
            id
        };
        let cloned = clone_subtree(&self.folder_tree, id, &mut allocate, now)
            .ok_or_else(|| AppError::internal(format!("Folder {id} vanished during duplicate")))?;
        self.next_id = next_id;

        for (source_id, copy_id) in &cloned.leaf_ids {
            let source = self.leaf(*source_id)?;
            let folder_id = tree::find_leaf_and_parent(&cloned.folder, *copy_id)
                .map(|(folder, _)| folder.id)
                .ok_or_else(|| {
                    AppError::internal(format!("Copied loadout {copy_id} is unlisted"))
                })?;
            let copy = LeafRecord::new(
                *copy_id,
                source.name.clone(),
                folder_id,
                source.payload.clone(),
                now,
            );
            self.leaf_records_by_id.insert(*copy_id, copy);
        }

        self.folder_tree = cloned.tree;
        Ok(DuplicateFolderSummary {
            folder: cloned.folder,
            folders_copied: cloned.folders_copied,
            leaves_copied: cloned.leaves_copied,
        })
    }

    /// Replace the order of one child sequence.
    pub fn reorder(
        &mut self,
        folder_id: FolderId,
        item_type: ItemType,
        ordered_ids: &[i64],
    ) -> AppResult<()> {
        let current = tree::child_ids(self.folder(folder_id)?, item_type);
        if !tree::is_permutation(&current, ordered_ids) {
            return Err(AppError::invalid_order(format!(
                "Expected a permutation of the {item_type} children of folder {folder_id}"
            )));
        }
        self.folder_tree =
            tree::with_child_order(&self.folder_tree, folder_id, item_type, ordered_ids);
        Ok(())
    }

    // ── Leaves ───────────────────────────────────────────────────

    /// Create a leaf at the end of a folder's listing.
    pub fn create_leaf(
        &mut self,
        name: &str,
        folder_id: FolderId,
        payload: Payload,
        now: DateTime<Utc>,
    ) -> AppResult<LeafRecord> {
        let name = normalize_name(name)?;
        self.folder(folder_id)?;
        let id = LeafId(self.allocate());
        let record = LeafRecord::new(id, name, folder_id, payload, now);
        self.folder_tree = tree::with_leaf_inserted(&self.folder_tree, folder_id, record.summary());
        self.leaf_records_by_id.insert(id, record.clone());
        Ok(record)
    }

    /// Rename a leaf.
    pub fn rename_leaf(&mut self, id: LeafId, name: &str, now: DateTime<Utc>) -> AppResult<()> {
        let name = normalize_name(name)?;
        let record = self.leaf_mut(id)?;
        record.name = name;
        record.updated_at = now;
        self.sync_summary(id)
    }

    /// Move a leaf to the end of another folder's listing.
    pub fn move_leaf(
        &mut self,
        id: LeafId,
        target_folder_id: FolderId,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let current = self.leaf(id)?.folder_id;
        self.folder(target_folder_id)?;
        if current == target_folder_id {
            return Ok(());
        }
        self.folder_tree = tree::with_leaf_moved(&self.folder_tree, id, target_folder_id);
        let record = self.leaf_mut(id)?;
        record.folder_id = target_folder_id;
        record.updated_at = now;
        self.sync_summary(id)
    }

    /// Toggle cascade-delete protection.
    pub fn set_leaf_protected(
        &mut self,
        id: LeafId,
        value: bool,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let record = self.leaf_mut(id)?;
        record.is_protected = value;
        record.updated_at = now;
        self.sync_summary(id)
    }

    /// Store one payload field.
    pub fn set_payload_field(
        &mut self,
        id: LeafId,
        key: u32,
        value: serde_json::Value,
        now: DateTime<Utc>,
    ) -> AppResult<LeafRecord> {
        let record = self.leaf_mut(id)?;
        record.payload.insert(key, value);
        record.updated_at = now;
        let updated = record.clone();
        self.sync_summary(id)?;
        Ok(updated)
    }

    /// Hard-delete a leaf.
    pub fn delete_leaf(&mut self, id: LeafId) -> AppResult<()> {
        self.leaf_records_by_id
            .remove(&id)
            .ok_or_else(|| AppError::not_found(format!("Loadout {id} not found")))?;
        self.folder_tree = tree::with_leaf_removed(&self.folder_tree, id);
        Ok(())
    }

    /// Copy a leaf into its own folder, unprotected and with a copy suffix.
    pub fn duplicate_leaf(&mut self, id: LeafId, now: DateTime<Utc>) -> AppResult<LeafSummary> {
        let source = self.leaf(id)?.clone();
        let copy_id = LeafId(self.allocate());
        let copy = LeafRecord::new(
            copy_id,
            copy_name(&source.name),
            source.folder_id,
            source.payload,
            now,
        );
        let summary = copy.summary();
        self.folder_tree =
            tree::with_leaf_inserted(&self.folder_tree, source.folder_id, summary.clone());
        self.leaf_records_by_id.insert(copy_id, copy);
        Ok(summary)
    }
}
