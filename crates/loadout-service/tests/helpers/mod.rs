//! Shared test helpers for coordinator integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use loadout_core::config::backend::LocalStoreConfig;
use loadout_core::config::coordinator::CoordinatorConfig;
use loadout_core::error::{AppError, ErrorKind};
use loadout_core::result::AppResult;
use loadout_core::traits::KeyValueStore;
use loadout_core::types::{FolderId, ItemType, LeafId};
use loadout_entity::{
    DeleteSummary, DuplicateFolderSummary, FolderNode, LeafRecord, LeafSummary, Payload,
};
use loadout_service::TreeCoordinator;
use loadout_store::{LocalTreeBackend, MemoryKeyValueStore, TreeBackend};

/// Local backend wrapper that can fail or stall chosen operations.
#[derive(Debug)]
pub struct FlakyBackend {
    inner: LocalTreeBackend,
    failures: Mutex<HashMap<&'static str, ErrorKind>>,
    delays: Mutex<HashMap<&'static str, Duration>>,
    calls: Mutex<Vec<&'static str>>,
}

impl FlakyBackend {
    /// Wrap a fresh in-memory local backend.
    pub fn new() -> Self {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new(0));
        Self {
            inner: LocalTreeBackend::new(store, &LocalStoreConfig::default()),
            failures: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make the next call of `op` fail with `kind` without reaching storage.
    pub fn fail_next(&self, op: &'static str, kind: ErrorKind) {
        self.failures.lock().unwrap().insert(op, kind);
    }

    /// Make every call of `op` wait before running.
    pub fn delay(&self, op: &'static str, by: Duration) {
        self.delays.lock().unwrap().insert(op, by);
    }

    /// Operations dispatched so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// The backend's own view of the tree, bypassing fault injection.
    pub async fn stored_tree(&self) -> Arc<FolderNode> {
        self.inner.get_tree().await.unwrap()
    }

    /// A leaf record straight from storage.
    pub async fn get_leaf_direct(&self, id: LeafId) -> LeafRecord {
        self.inner.get_leaf(id).await.unwrap()
    }

    async fn enter(&self, op: &'static str) -> AppResult<()> {
        self.calls.lock().unwrap().push(op);
        let delay = self.delays.lock().unwrap().get(op).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.lock().unwrap().remove(op) {
            Some(kind) => Err(AppError::new(kind, format!("injected {op} failure"))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TreeBackend for FlakyBackend {
    fn backend_type(&self) -> &str {
        "flaky"
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }

    async fn get_tree(&self) -> AppResult<Arc<FolderNode>> {
        self.enter("get_tree").await?;
        self.inner.get_tree().await
    }

    async fn get_leaf(&self, id: LeafId) -> AppResult<LeafRecord> {
        self.enter("get_leaf").await?;
        self.inner.get_leaf(id).await
    }

    async fn create_folder(&self, name: &str, parent_id: FolderId) -> AppResult<FolderId> {
        self.enter("create_folder").await?;
        self.inner.create_folder(name, parent_id).await
    }

    async fn rename_folder(&self, id: FolderId, name: &str) -> AppResult<()> {
        self.enter("rename_folder").await?;
        self.inner.rename_folder(id, name).await
    }

    async fn move_folder(&self, id: FolderId, target_parent_id: FolderId) -> AppResult<()> {
        self.enter("move_folder").await?;
        self.inner.move_folder(id, target_parent_id).await
    }

    async fn set_read_only(&self, id: FolderId, value: bool) -> AppResult<()> {
        self.enter("set_read_only").await?;
        self.inner.set_read_only(id, value).await
    }

    async fn delete_folder(&self, id: FolderId, force: bool) -> AppResult<DeleteSummary> {
        self.enter("delete_folder").await?;
        self.inner.delete_folder(id, force).await
    }

    async fn duplicate_folder(&self, id: FolderId) -> AppResult<DuplicateFolderSummary> {
        self.enter("duplicate_folder").await?;
        self.inner.duplicate_folder(id).await
    }

    async fn reorder(
        &self,
        folder_id: FolderId,
        item_type: ItemType,
        ordered_ids: &[i64],
    ) -> AppResult<()> {
        self.enter("reorder").await?;
        self.inner.reorder(folder_id, item_type, ordered_ids).await
    }

    async fn create_leaf(
        &self,
        name: &str,
        folder_id: FolderId,
        payload: Payload,
    ) -> AppResult<LeafRecord> {
        self.enter("create_leaf").await?;
        self.inner.create_leaf(name, folder_id, payload).await
    }

    async fn rename_leaf(&self, id: LeafId, name: &str) -> AppResult<()> {
        self.enter("rename_leaf").await?;
        self.inner.rename_leaf(id, name).await
    }

    async fn move_leaf(&self, id: LeafId, target_folder_id: FolderId) -> AppResult<()> {
        self.enter("move_leaf").await?;
        self.inner.move_leaf(id, target_folder_id).await
    }

    async fn set_leaf_protected(&self, id: LeafId, value: bool) -> AppResult<()> {
        self.enter("set_leaf_protected").await?;
        self.inner.set_leaf_protected(id, value).await
    }

    async fn set_payload_field(&self, id: LeafId, key: u32, value: Value) -> AppResult<LeafRecord> {
        self.enter("set_payload_field").await?;
        self.inner.set_payload_field(id, key, value).await
    }

    async fn delete_leaf(&self, id: LeafId) -> AppResult<()> {
        self.enter("delete_leaf").await?;
        self.inner.delete_leaf(id).await
    }

    async fn duplicate_leaf(&self, id: LeafId) -> AppResult<LeafSummary> {
        self.enter("duplicate_leaf").await?;
        self.inner.duplicate_leaf(id).await
    }

    async fn try_unlock(&self, guess: &str, reference: &str) -> AppResult<bool> {
        self.enter("try_unlock").await?;
        self.inner.try_unlock(guess, reference).await
    }

    async fn is_unlocked(&self, reference: &str) -> AppResult<bool> {
        self.enter("is_unlocked").await?;
        self.inner.is_unlocked(reference).await
    }
}

/// A coordinator over a [`FlakyBackend`], loaded and ready.
pub struct TestTree {
    pub coordinator: Arc<TreeCoordinator>,
    pub backend: Arc<FlakyBackend>,
}

impl TestTree {
    /// Create an empty tree.
    pub async fn new() -> Self {
        let backend = Arc::new(FlakyBackend::new());
        let coordinator = Arc::new(TreeCoordinator::new(
            Arc::clone(&backend) as Arc<dyn TreeBackend>,
            &CoordinatorConfig::default(),
        ));
        coordinator.refresh().await.expect("Failed to load tree");
        Self {
            coordinator,
            backend,
        }
    }

    /// Create a folder through the coordinator.
    pub async fn folder(&self, name: &str, parent: FolderId) -> FolderId {
        self.coordinator
            .create_folder(name, parent)
            .await
            .into_result()
            .expect("Failed to create folder")
            .expect("Folder create superseded")
    }

    /// Create a leaf through the coordinator.
    pub async fn leaf(&self, name: &str, folder: FolderId) -> LeafId {
        self.coordinator
            .create_leaf(name, folder, Payload::new())
            .await
            .into_result()
            .expect("Failed to create loadout")
            .expect("Loadout create superseded")
            .id
    }

    /// Leaf ids listed in a folder of the visible tree.
    pub fn leaves_in(&self, folder: FolderId) -> Vec<LeafId> {
        let tree = self.coordinator.tree();
        loadout_entity::folder::tree::find_folder(&tree, folder)
            .map(|f| f.leaves.iter().map(|l| l.id).collect())
            .unwrap_or_default()
    }

    /// Child folder ids of a folder in the visible tree.
    pub fn folders_in(&self, folder: FolderId) -> Vec<FolderId> {
        let tree = self.coordinator.tree();
        loadout_entity::folder::tree::find_folder(&tree, folder)
            .map(|f| f.children.iter().map(|c| c.id).collect())
            .unwrap_or_default()
    }
}
