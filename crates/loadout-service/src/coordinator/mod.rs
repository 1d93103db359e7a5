//! Optimistic mutation coordinator.
//!
//! The coordinator owns the tree the presentation layer renders. Edits to
//! existing items are applied to it at once, then sent to the backend; a
//! rejection restores the pre-edit snapshot and raises a [`Notice`].
//! Creates and duplicates wait for the backend because only it can assign
//! ids. Edits that share a [`MutationKey`] supersede each other: the older
//! request is dropped and its result ignored.

mod inflight;
mod notice;
mod outcome;

pub use inflight::{InFlight, MutationKey, Ticket};
pub use notice::Notice;
pub use outcome::Outcome;

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use loadout_core::config::coordinator::CoordinatorConfig;
use loadout_core::error::AppError;
use loadout_core::result::AppResult;
use loadout_core::types::{FolderId, ItemType, LeafId};
use loadout_entity::folder::tree::{
    effective_read_only, find_folder, find_leaf_and_parent, path_to, with_child_order,
    with_folder_inserted, with_folder_moved, with_folder_renamed, with_leaf_inserted,
    with_leaf_moved, with_leaf_removed, with_leaf_renamed, with_leaf_updated, with_read_only,
    would_create_cycle,
};
use loadout_entity::folder::{cascade_delete, normalize_name};
use loadout_entity::{
    DeleteSummary, DuplicateFolderSummary, FolderNode, LeafRecord, LeafSummary, Payload,
};
use loadout_store::TreeBackend;

use crate::drag::{DragSource, DropIntent, DropTarget, resolve_drop};

/// State restored when the backend rejects an optimistic edit.
#[derive(Debug)]
struct Snapshot {
    tree: Arc<FolderNode>,
    /// Cached leaf record as it was before the edit touched it.
    leaf: Option<LeafRecord>,
}

/// Coordinates tree mutations between the view and a backend.
#[derive(Debug)]
pub struct TreeCoordinator {
    backend: Arc<dyn TreeBackend>,
    tree: watch::Sender<Arc<FolderNode>>,
    notices: broadcast::Sender<Notice>,
    leaves: DashMap<LeafId, LeafRecord>,
    inflight: InFlight,
}

impl TreeCoordinator {
    /// Create a coordinator. The tree is empty until [`refresh`](Self::refresh).
    pub fn new(backend: Arc<dyn TreeBackend>, config: &CoordinatorConfig) -> Self {
        let (tree, _) = watch::channel(Arc::new(FolderNode::default()));
        let (notices, _) = broadcast::channel(config.notice_capacity.max(1));
        Self {
            backend,
            tree,
            notices,
            leaves: DashMap::new(),
            inflight: InFlight::default(),
        }
    }

    // ── Reads ──────────────────────────────────────────────────────

    /// Fetch the tree from the backend and make it the visible one.
    pub async fn refresh(&self) -> AppResult<Arc<FolderNode>> {
        let tree = self.backend.get_tree().await?;
        self.leaves.clear();
        self.tree.send_replace(Arc::clone(&tree));
        info!(backend = self.backend.backend_type(), "Tree loaded");
        Ok(tree)
    }

    /// The visible tree.
    pub fn tree(&self) -> Arc<FolderNode> {
        Arc::clone(&self.tree.borrow())
    }

    /// Receive every new visible tree.
    pub fn subscribe(&self) -> watch::Receiver<Arc<FolderNode>> {
        self.tree.subscribe()
    }

    /// Receive a notice for each failed operation.
    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Full leaf record, from cache when possible.
    pub async fn get_leaf(&self, id: LeafId) -> AppResult<LeafRecord> {
        if let Some(record) = self.leaves.get(&id) {
            return Ok(record.value().clone());
        }
        let record = self.backend.get_leaf(id).await?;
        self.leaves.insert(id, record.clone());
        Ok(record)
    }

    /// Whether a folder or any ancestor is read-only in the visible tree.
    pub fn is_read_only(&self, folder_id: FolderId) -> bool {
        effective_read_only(&self.tree(), folder_id)
    }

    /// Folder names from the root down to `folder_id`.
    pub fn breadcrumb(&self, folder_id: FolderId) -> Vec<String> {
        path_to(&self.tree(), folder_id)
    }

    /// Name of the active backend.
    pub fn backend_type(&self) -> &str {
        self.backend.backend_type()
    }

    // ── Folder mutations ───────────────────────────────────────────

    /// Create a folder. Shown once the backend has assigned its id.
    pub async fn create_folder(&self, name: &str, parent_id: FolderId) -> Outcome<FolderId> {
        let name = match normalize_name(name) {
            Ok(name) => name,
            Err(e) => return self.reject("create_folder", e),
        };
        match self.backend.create_folder(&name, parent_id).await {
            Ok(id) => {
                let folder = Arc::new(FolderNode::new(id, name, parent_id));
                self.apply(|tree| with_folder_inserted(tree, parent_id, folder));
                info!(folder_id = %id, parent_id = %parent_id, "Folder created");
                Outcome::Committed(id)
            }
            Err(e) => self.fail("create_folder", e),
        }
    }

    /// Rename a folder.
    pub async fn rename_folder(&self, id: FolderId, name: &str) -> Outcome<()> {
        if id == FolderId::ROOT {
            return self.reject(
                "rename_folder",
                AppError::invalid_move("The root folder cannot be renamed"),
            );
        }
        let name = match normalize_name(name) {
            Ok(name) => name,
            Err(e) => return self.reject("rename_folder", e),
        };
        let ticket = self.inflight.begin(MutationKey::FolderName(id));
        let snapshot = self.snapshot(|tree| with_folder_renamed(tree, id, &name), None);
        let call = self.backend.rename_folder(id, &name);
        self.settle("rename_folder", snapshot, Some(ticket), call).await
    }

    /// Move a folder to the end of another folder's children.
    pub async fn move_folder(&self, id: FolderId, target_parent_id: FolderId) -> Outcome<()> {
        let source = find_folder(&self.tree(), id).and_then(|f| f.parent_id);
        let checked = self.check_folder_move(id, target_parent_id).and_then(|()| {
            self.check_move_writable(ItemType::Folder, id.get(), source, target_parent_id)
        });
        if let Err(e) = checked {
            return self.reject("move_folder", e);
        }
        let snapshot = self.snapshot(|tree| with_folder_moved(tree, id, target_parent_id), None);
        let call = self.backend.move_folder(id, target_parent_id);
        self.settle("move_folder", snapshot, None, call).await
    }

    /// Set or clear a folder's read-only flag.
    pub async fn set_read_only(&self, id: FolderId, value: bool) -> Outcome<()> {
        let snapshot = self.snapshot(|tree| with_read_only(tree, id, value), None);
        let call = self.backend.set_read_only(id, value);
        self.settle("set_read_only", snapshot, None, call).await
    }

    /// Delete a folder subtree, rescuing protected leaves into its parent.
    ///
    /// The optimistic tree uses the same cascade the local backend runs.
    /// Without `force` a populated folder stays visible until the backend
    /// answers.
    pub async fn delete_folder(&self, id: FolderId, force: bool) -> Outcome<DeleteSummary> {
        if id == FolderId::ROOT {
            return self.reject(
                "delete_folder",
                AppError::invalid_move("The root folder cannot be deleted"),
            );
        }
        let now = Utc::now();
        let mut touched = Vec::new();
        let snapshot = self.snapshot(
            |tree| {
                let populated = find_folder(tree, id).is_some_and(FolderNode::has_children);
                if populated && !force {
                    return Arc::clone(tree);
                }
                match cascade_delete(tree, id, now) {
                    Some(cascade) => {
                        touched.extend(cascade.deleted_leaf_ids);
                        touched.extend(cascade.rescued_leaf_ids);
                        cascade.tree
                    }
                    None => Arc::clone(tree),
                }
            },
            None,
        );

        let call = self.backend.delete_folder(id, force);
        let outcome = self.settle("delete_folder", snapshot, None, call).await;
        if let Outcome::Committed(summary) = &outcome {
            for leaf_id in &touched {
                self.leaves.remove(leaf_id);
            }
            info!(
                folder_id = %id,
                folders_deleted = summary.folders_deleted,
                loadouts_deleted = summary.loadouts_deleted,
                protected_moved = summary.protected_loadouts_moved,
                "Folder deleted"
            );
        }
        outcome
    }

    /// Deep-copy a folder next to the original.
    pub async fn duplicate_folder(&self, id: FolderId) -> Outcome<DuplicateFolderSummary> {
        if id == FolderId::ROOT {
            return self.reject(
                "duplicate_folder",
                AppError::invalid_move("The root folder cannot be duplicated"),
            );
        }
        match self.backend.duplicate_folder(id).await {
            Ok(summary) => {
                match summary.folder.parent_id {
                    Some(parent_id) => {
                        let folder = Arc::clone(&summary.folder);
                        self.apply(|tree| with_folder_inserted(tree, parent_id, folder));
                    }
                    None => self.resync("duplicate_folder").await,
                }
                info!(
                    folder_id = %id,
                    copy_id = %summary.folder.id,
                    folders_copied = summary.folders_copied,
                    leaves_copied = summary.leaves_copied,
                    "Folder duplicated"
                );
                Outcome::Committed(summary)
            }
            Err(e) => self.fail("duplicate_folder", e),
        }
    }

    /// Replace the order of one child sequence of a folder.
    pub async fn reorder(
        &self,
        folder_id: FolderId,
        item_type: ItemType,
        ordered_ids: Vec<i64>,
    ) -> Outcome<()> {
        if effective_read_only(&self.tree(), folder_id) {
            return self.reject("reorder", read_only_error(folder_id));
        }
        let snapshot = self.snapshot(
            |tree| with_child_order(tree, folder_id, item_type, &ordered_ids),
            None,
        );
        let call = self.backend.reorder(folder_id, item_type, &ordered_ids);
        self.settle("reorder", snapshot, None, call).await
    }

    /// Move an item into another folder at a specific position.
    ///
    /// Runs as a move followed by a reorder of the destination. A failed
    /// move restores the snapshot. A failed reorder leaves the backend with
    /// the move applied, so the tree is re-fetched instead; if that fails
    /// too the tree keeps the moved-but-unordered state.
    pub async fn move_to_position(
        &self,
        item_type: ItemType,
        item_id: i64,
        source_folder_id: FolderId,
        target_folder_id: FolderId,
        ordered_ids: Vec<i64>,
    ) -> Outcome<()> {
        if source_folder_id == target_folder_id {
            return self.reorder(target_folder_id, item_type, ordered_ids).await;
        }
        if item_type == ItemType::Folder
            && let Err(e) = self.check_folder_move(FolderId(item_id), target_folder_id)
        {
            return self.reject("move_to_position", e);
        }
        if let Err(e) = self.check_move_writable(
            item_type,
            item_id,
            Some(source_folder_id),
            target_folder_id,
        ) {
            return self.reject("move_to_position", e);
        }

        let now = Utc::now();
        let mut moved_tree = None;
        let cached = match item_type {
            ItemType::Leaf => self.patch_leaf(LeafId(item_id), |record| {
                record.folder_id = target_folder_id;
                record.updated_at = now;
            }),
            ItemType::Folder => None,
        };
        let snapshot = self.snapshot(
            |tree| {
                let moved = match item_type {
                    ItemType::Folder => with_folder_moved(tree, FolderId(item_id), target_folder_id),
                    ItemType::Leaf => with_leaf_moved(tree, LeafId(item_id), target_folder_id),
                };
                let ordered = with_child_order(&moved, target_folder_id, item_type, &ordered_ids);
                moved_tree = Some(moved);
                ordered
            },
            cached,
        );

        let call = match item_type {
            ItemType::Folder => self.backend.move_folder(FolderId(item_id), target_folder_id),
            ItemType::Leaf => self.backend.move_leaf(LeafId(item_id), target_folder_id),
        };
        let moved = self.settle("move_to_position", snapshot, None, call).await;
        if !moved.is_committed() {
            return moved;
        }

        let Err(e) = self
            .backend
            .reorder(target_folder_id, item_type, &ordered_ids)
            .await
        else {
            return Outcome::Committed(());
        };

        warn!(
            item_type = %item_type,
            item_id,
            target_folder_id = %target_folder_id,
            error = %e,
            "Reorder after move failed, re-fetching tree"
        );
        self.notify(&e);
        if let Err(refetch) = self.refresh().await {
            error!(error = %refetch, "Re-fetch after partial move failed, keeping moved tree");
            if let Some(tree) = moved_tree {
                self.tree.send_replace(tree);
            }
            self.notify(&refetch);
        }
        Outcome::Reconciled(e)
    }

    // ── Leaf mutations ─────────────────────────────────────────────

    /// Create a leaf. Shown once the backend has assigned its id.
    pub async fn create_leaf(
        &self,
        name: &str,
        folder_id: FolderId,
        payload: Payload,
    ) -> Outcome<LeafRecord> {
        let name = match normalize_name(name) {
            Ok(name) => name,
            Err(e) => return self.reject("create_leaf", e),
        };
        match self.backend.create_leaf(&name, folder_id, payload).await {
            Ok(record) => {
                let summary = record.summary();
                self.apply(|tree| with_leaf_inserted(tree, folder_id, summary));
                self.leaves.insert(record.id, record.clone());
                info!(leaf_id = %record.id, folder_id = %folder_id, "Loadout created");
                Outcome::Committed(record)
            }
            Err(e) => self.fail("create_leaf", e),
        }
    }

    /// Rename a leaf.
    pub async fn rename_leaf(&self, id: LeafId, name: &str) -> Outcome<()> {
        let name = match normalize_name(name) {
            Ok(name) => name,
            Err(e) => return self.reject("rename_leaf", e),
        };
        let now = Utc::now();
        let ticket = self.inflight.begin(MutationKey::LeafName(id));
        let cached = self.patch_leaf(id, |record| {
            record.name = name.clone();
            record.updated_at = now;
        });
        let snapshot = self.snapshot(|tree| with_leaf_renamed(tree, id, &name, now), cached);
        let call = self.backend.rename_leaf(id, &name);
        self.settle("rename_leaf", snapshot, Some(ticket), call).await
    }

    /// Move a leaf to the end of another folder's listing.
    pub async fn move_leaf(&self, id: LeafId, target_folder_id: FolderId) -> Outcome<()> {
        let source = find_leaf_and_parent(&self.tree(), id).map(|(parent, _)| parent.id);
        if let Err(e) = self.check_move_writable(ItemType::Leaf, id.get(), source, target_folder_id)
        {
            return self.reject("move_leaf", e);
        }
        let now = Utc::now();
        let cached = self.patch_leaf(id, |record| {
            record.folder_id = target_folder_id;
            record.updated_at = now;
        });
        let snapshot = self.snapshot(|tree| with_leaf_moved(tree, id, target_folder_id), cached);
        let call = self.backend.move_leaf(id, target_folder_id);
        self.settle("move_leaf", snapshot, None, call).await
    }

    /// Set or clear a leaf's protection against folder cascades.
    pub async fn set_leaf_protected(&self, id: LeafId, value: bool) -> Outcome<()> {
        let now = Utc::now();
        let cached = self.patch_leaf(id, |record| {
            record.is_protected = value;
            record.updated_at = now;
        });
        let snapshot = self.snapshot(
            |tree| {
                with_leaf_updated(tree, id, |leaf| {
                    leaf.is_protected = value;
                    leaf.updated_at = now;
                })
            },
            cached,
        );
        let call = self.backend.set_leaf_protected(id, value);
        self.settle("set_leaf_protected", snapshot, None, call).await
    }

    /// Write one payload field.
    ///
    /// A newer write to the same field supersedes this one, which then
    /// resolves to [`Outcome::Superseded`].
    pub async fn set_payload_field(
        &self,
        id: LeafId,
        field: u32,
        value: Value,
    ) -> Outcome<LeafRecord> {
        let now = Utc::now();
        let ticket = self.inflight.begin(MutationKey::PayloadField { leaf_id: id, field });
        let cached = self.patch_leaf(id, |record| {
            record.payload.insert(field, value.clone());
            record.updated_at = now;
        });
        let snapshot = self.snapshot(
            |tree| with_leaf_updated(tree, id, |leaf| leaf.updated_at = now),
            cached,
        );
        let call = self.backend.set_payload_field(id, field, value);
        let outcome = self
            .settle("set_payload_field", snapshot, Some(ticket), call)
            .await;
        if let Outcome::Committed(record) = &outcome {
            let updated_at = record.updated_at;
            self.apply(|tree| with_leaf_updated(tree, id, |leaf| leaf.updated_at = updated_at));
            self.leaves.insert(id, record.clone());
        }
        outcome
    }

    /// Delete one leaf. Protection does not apply here.
    pub async fn delete_leaf(&self, id: LeafId) -> Outcome<()> {
        let cached = self.leaves.remove(&id).map(|(_, record)| record);
        let snapshot = self.snapshot(|tree| with_leaf_removed(tree, id), cached);
        let call = self.backend.delete_leaf(id);
        let outcome = self.settle("delete_leaf", snapshot, None, call).await;
        if outcome.is_committed() {
            info!(leaf_id = %id, "Loadout deleted");
        }
        outcome
    }

    /// Copy a leaf into the same folder.
    pub async fn duplicate_leaf(&self, id: LeafId) -> Outcome<LeafSummary> {
        match self.backend.duplicate_leaf(id).await {
            Ok(summary) => {
                let parent_id = find_leaf_and_parent(&self.tree(), id).map(|(parent, _)| parent.id);
                match parent_id {
                    Some(parent_id) => {
                        let copy = summary.clone();
                        self.apply(|tree| with_leaf_inserted(tree, parent_id, copy));
                    }
                    None => self.resync("duplicate_leaf").await,
                }
                info!(leaf_id = %id, copy_id = %summary.id, "Loadout duplicated");
                Outcome::Committed(summary)
            }
            Err(e) => self.fail("duplicate_leaf", e),
        }
    }

    // ── Drops ──────────────────────────────────────────────────────

    /// Resolve a drop against the visible tree and run it.
    pub async fn drop_item(&self, source: &DragSource, target: &DropTarget) -> Outcome<()> {
        let intent = resolve_drop(&self.tree(), source, target);
        self.apply_drop(intent).await
    }

    /// Run a resolved drop. Rejected drops change nothing and raise no notice.
    pub async fn apply_drop(&self, intent: DropIntent) -> Outcome<()> {
        match intent {
            DropIntent::MoveInto {
                item_type: ItemType::Folder,
                item_id,
                target_folder_id,
            } => self.move_folder(FolderId(item_id), target_folder_id).await,
            DropIntent::MoveInto {
                item_type: ItemType::Leaf,
                item_id,
                target_folder_id,
            } => self.move_leaf(LeafId(item_id), target_folder_id).await,
            DropIntent::Reorder {
                folder_id,
                item_type,
                ordered_ids,
            } => self.reorder(folder_id, item_type, ordered_ids).await,
            DropIntent::MoveAndReorder {
                item_type,
                item_id,
                source_folder_id,
                target_folder_id,
                ordered_ids,
            } => {
                self.move_to_position(
                    item_type,
                    item_id,
                    source_folder_id,
                    target_folder_id,
                    ordered_ids,
                )
                .await
            }
            DropIntent::Rejected(reason) => {
                debug!(%reason, "Drop ignored");
                Outcome::Rejected(AppError::invalid_move(reason.to_string()))
            }
        }
    }

    // ── Unlock gate ────────────────────────────────────────────────

    /// Check a guess against a reference; remembered when it matches.
    pub async fn try_unlock(&self, guess: &str, reference: &str) -> AppResult<bool> {
        self.backend.try_unlock(guess, reference).await
    }

    /// Whether a reference was unlocked before.
    pub async fn is_unlocked(&self, reference: &str) -> AppResult<bool> {
        self.backend.is_unlocked(reference).await
    }

    // ── Internals ──────────────────────────────────────────────────

    /// Replace the visible tree with `transform` of it, returning the old one.
    fn apply<F>(&self, transform: F) -> Arc<FolderNode>
    where
        F: FnOnce(&Arc<FolderNode>) -> Arc<FolderNode>,
    {
        let mut previous = None;
        self.tree.send_if_modified(|current| {
            let next = transform(current);
            if Arc::ptr_eq(&next, current) {
                previous = Some(Arc::clone(current));
                return false;
            }
            previous = Some(std::mem::replace(current, next));
            true
        });
        previous.unwrap_or_else(|| self.tree())
    }

    fn snapshot<F>(&self, transform: F, leaf: Option<LeafRecord>) -> Snapshot
    where
        F: FnOnce(&Arc<FolderNode>) -> Arc<FolderNode>,
    {
        Snapshot {
            tree: self.apply(transform),
            leaf,
        }
    }

    /// Edit a cached leaf record in place, returning its previous value.
    fn patch_leaf<F>(&self, id: LeafId, f: F) -> Option<LeafRecord>
    where
        F: FnOnce(&mut LeafRecord),
    {
        let mut entry = self.leaves.get_mut(&id)?;
        let previous = entry.value().clone();
        f(entry.value_mut());
        Some(previous)
    }

    fn restore(&self, snapshot: Snapshot) {
        self.tree.send_replace(snapshot.tree);
        if let Some(record) = snapshot.leaf {
            self.leaves.insert(record.id, record);
        }
    }

    /// Await the backend call for an applied edit and reconcile.
    async fn settle<T, Fut>(
        &self,
        op: &'static str,
        snapshot: Snapshot,
        ticket: Option<Ticket>,
        call: Fut,
    ) -> Outcome<T>
    where
        Fut: Future<Output = AppResult<T>>,
    {
        let result = match &ticket {
            Some(ticket) => {
                let result = tokio::select! {
                    biased;
                    () = ticket.superseded() => None,
                    result = call => Some(result),
                };
                self.inflight.finish(ticket);
                match result {
                    Some(result) if !ticket.is_superseded() => result,
                    _ => {
                        debug!(op, "Superseded by a newer edit, result discarded");
                        return Outcome::Superseded;
                    }
                }
            }
            None => call.await,
        };

        match result {
            Ok(value) => {
                debug!(op, "Committed");
                Outcome::Committed(value)
            }
            Err(e) => {
                warn!(op, error = %e, "Backend rejected mutation, rolling back");
                self.restore(snapshot);
                self.notify(&e);
                Outcome::RolledBack(e)
            }
        }
    }

    /// A pessimistic call failed; nothing was shown yet.
    fn fail<T>(&self, op: &'static str, e: AppError) -> Outcome<T> {
        warn!(op, error = %e, "Backend rejected mutation");
        self.notify(&e);
        Outcome::RolledBack(e)
    }

    fn reject<T>(&self, op: &'static str, e: AppError) -> Outcome<T> {
        debug!(op, error = %e, "Rejected before dispatch");
        self.notify(&e);
        Outcome::Rejected(e)
    }

    fn notify(&self, e: &AppError) {
        // no receivers is fine
        let _ = self.notices.send(Notice::from(e));
    }

    /// Re-fetch after a commit whose result could not be placed locally.
    async fn resync(&self, op: &'static str) {
        if let Err(e) = self.refresh().await {
            error!(op, error = %e, "Re-fetch failed");
            self.notify(&e);
        }
    }

    fn check_folder_move(&self, id: FolderId, target_parent_id: FolderId) -> AppResult<()> {
        if id == FolderId::ROOT {
            return Err(AppError::invalid_move("The root folder cannot be moved"));
        }
        if would_create_cycle(&self.tree(), id, target_parent_id) {
            return Err(AppError::invalid_move(format!(
                "Folder {id} cannot be moved into itself or one of its descendants"
            )));
        }
        Ok(())
    }

    /// Refuse moves out of, into or of a read-only folder.
    fn check_move_writable(
        &self,
        item_type: ItemType,
        item_id: i64,
        source_folder_id: Option<FolderId>,
        target_folder_id: FolderId,
    ) -> AppResult<()> {
        let tree = self.tree();
        let moved_folder = (item_type == ItemType::Folder).then_some(FolderId(item_id));
        let locked = moved_folder
            .into_iter()
            .chain(source_folder_id)
            .chain([target_folder_id])
            .find(|id| effective_read_only(&tree, *id));
        match locked {
            Some(id) => Err(read_only_error(id)),
            None => Ok(()),
        }
    }
}

fn read_only_error(folder_id: FolderId) -> AppError {
    AppError::invalid_move(format!("Folder {folder_id} is read-only"))
}
