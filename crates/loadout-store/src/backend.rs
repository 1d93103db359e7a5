//! The mutation contract shared by every store backend.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use loadout_core::result::AppResult;
use loadout_core::types::{FolderId, ItemType, LeafId};
use loadout_entity::{
    DeleteSummary, DuplicateFolderSummary, FolderNode, LeafRecord, LeafSummary, Payload,
};

/// A durable home for one loadout tree.
///
/// Local and remote implementations report the same errors for the same
/// inputs, so callers never branch on which one is active.
#[async_trait]
pub trait TreeBackend: Send + Sync + Debug + 'static {
    /// Return the backend type identifier (`"local"`, `"remote"`).
    fn backend_type(&self) -> &str;

    /// Check whether the backend is reachable and usable.
    async fn health_check(&self) -> AppResult<bool>;

    // ── Queries ──────────────────────────────────────────────────

    /// Fetch the authoritative tree.
    async fn get_tree(&self) -> AppResult<Arc<FolderNode>>;

    /// Fetch a full leaf record.
    async fn get_leaf(&self, id: LeafId) -> AppResult<LeafRecord>;

    // ── Folders ──────────────────────────────────────────────────

    /// Create an empty folder at the end of `parent_id`'s children.
    async fn create_folder(&self, name: &str, parent_id: FolderId) -> AppResult<FolderId>;

    /// Rename a folder.
    async fn rename_folder(&self, id: FolderId, name: &str) -> AppResult<()>;

    /// Move a folder to the end of another folder's children.
    async fn move_folder(&self, id: FolderId, target_parent_id: FolderId) -> AppResult<()>;

    /// Set the read-only flag on one folder.
    async fn set_read_only(&self, id: FolderId, value: bool) -> AppResult<()>;

    /// Delete a folder. A populated folder needs `force`.
    async fn delete_folder(&self, id: FolderId, force: bool) -> AppResult<DeleteSummary>;

    /// Deep-copy a folder subtree next to the original.
    async fn duplicate_folder(&self, id: FolderId) -> AppResult<DuplicateFolderSummary>;

    /// Replace the order of one child sequence.
    async fn reorder(
        &self,
        folder_id: FolderId,
        item_type: ItemType,
        ordered_ids: &[i64],
    ) -> AppResult<()>;

    // ── Leaves ───────────────────────────────────────────────────

    /// Create a leaf at the end of a folder's listing.
    async fn create_leaf(
        &self,
        name: &str,
        folder_id: FolderId,
        payload: Payload,
    ) -> AppResult<LeafRecord>;

    /// Rename a leaf.
    async fn rename_leaf(&self, id: LeafId, name: &str) -> AppResult<()>;

    /// Move a leaf to the end of another folder's listing.
    async fn move_leaf(&self, id: LeafId, target_folder_id: FolderId) -> AppResult<()>;

    /// Toggle cascade-delete protection.
    async fn set_leaf_protected(&self, id: LeafId, value: bool) -> AppResult<()>;

    /// Store one payload field.
    async fn set_payload_field(
        &self,
        id: LeafId,
        key: u32,
        value: serde_json::Value,
    ) -> AppResult<LeafRecord>;

    /// Hard-delete a leaf regardless of protection.
    async fn delete_leaf(&self, id: LeafId) -> AppResult<()>;

    /// Copy a leaf into the same folder.
    async fn duplicate_leaf(&self, id: LeafId) -> AppResult<LeafSummary>;

    // ── Unlock gate ──────────────────────────────────────────────

    /// Check a guess against a reference and remember a match.
    async fn try_unlock(&self, guess: &str, reference: &str) -> AppResult<bool>;

    /// Whether a reference was unlocked before.
    async fn is_unlocked(&self, reference: &str) -> AppResult<bool>;
}
