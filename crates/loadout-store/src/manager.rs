//! Backend manager that dispatches to the configured backend.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use loadout_core::config::backend::BackendConfig;
use loadout_core::error::AppError;
use loadout_core::result::AppResult;
use loadout_core::traits::KeyValueStore;
use loadout_core::types::{FolderId, ItemType, LeafId};
use loadout_entity::{
    DeleteSummary, DuplicateFolderSummary, FolderNode, LeafRecord, LeafSummary, Payload,
};

use crate::backend::TreeBackend;
use crate::kv::{FileKeyValueStore, MemoryKeyValueStore};
use crate::local::LocalTreeBackend;

/// Backend manager that wraps the configured tree backend.
///
/// The backend is selected once at construction time based on
/// configuration and handed to the coordinator from there.
#[derive(Debug, Clone)]
pub struct BackendManager {
    /// The inner backend.
    inner: Arc<dyn TreeBackend>,
}

impl BackendManager {
    /// Create a backend manager from configuration.
    pub async fn new(config: &BackendConfig) -> AppResult<Self> {
        let inner: Arc<dyn TreeBackend> = match config.mode.as_str() {
            "local" => {
                info!(data_dir = %config.local.data_dir, "Initializing local tree backend");
                let store: Arc<dyn KeyValueStore> = Arc::new(
                    FileKeyValueStore::new(&config.local.data_dir, config.local.quota_bytes)
                        .await?,
                );
                Arc::new(LocalTreeBackend::new(store, &config.local))
            }
            "memory" => {
                info!("Initializing in-memory tree backend");
                let store: Arc<dyn KeyValueStore> =
                    Arc::new(MemoryKeyValueStore::new(config.local.quota_bytes));
                Arc::new(LocalTreeBackend::new(store, &config.local))
            }
            #[cfg(feature = "remote")]
            "remote" => {
                info!(base_url = %config.remote.base_url, "Initializing remote tree backend");
                Arc::new(crate::remote::RemoteTreeBackend::new(&config.remote)?)
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown backend mode: '{other}'. Supported: local, memory, remote"
                )));
            }
        };

        Ok(Self { inner })
    }
}

#[async_trait]
impl TreeBackend for BackendManager {
    fn backend_type(&self) -> &str {
        self.inner.backend_type()
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }

    async fn get_tree(&self) -> AppResult<Arc<FolderNode>> {
        self.inner.get_tree().await
    }

    async fn get_leaf(&self, id: LeafId) -> AppResult<LeafRecord> {
        self.inner.get_leaf(id).await
    }

    async fn create_folder(&self, name: &str, parent_id: FolderId) -> AppResult<FolderId> {
        self.inner.create_folder(name, parent_id).await
    }

    async fn rename_folder(&self, id: FolderId, name: &str) -> AppResult<()> {
        self.inner.rename_folder(id, name).await
    }

    async fn move_folder(&self, id: FolderId, target_parent_id: FolderId) -> AppResult<()> {
        self.inner.move_folder(id, target_parent_id).await
    }

    async fn set_read_only(&self, id: FolderId, value: bool) -> AppResult<()> {
        self.inner.set_read_only(id, value).await
    }

    async fn delete_folder(&self, id: FolderId, force: bool) -> AppResult<DeleteSummary> {
        self.inner.delete_folder(id, force).await
    }

    async fn duplicate_folder(&self, id: FolderId) -> AppResult<DuplicateFolderSummary> {
        self.inner.duplicate_folder(id).await
    }

    async fn reorder(
        &self,
        folder_id: FolderId,
        item_type: ItemType,
        ordered_ids: &[i64],
    ) -> AppResult<()> {
        self.inner.reorder(folder_id, item_type, ordered_ids).await
    }

    async fn create_leaf(
        &self,
        name: &str,
        folder_id: FolderId,
        payload: Payload,
    ) -> AppResult<LeafRecord> {
        self.inner.create_leaf(name, folder_id, payload).await
    }

    async fn rename_leaf(&self, id: LeafId, name: &str) -> AppResult<()> {
        self.inner.rename_leaf(id, name).await
    }

    async fn move_leaf(&self, id: LeafId, target_folder_id: FolderId) -> AppResult<()> {
        self.inner.move_leaf(id, target_folder_id).await
    }

    async fn set_leaf_protected(&self, id: LeafId, value: bool) -> AppResult<()> {
        self.inner.set_leaf_protected(id, value).await
    }

    async fn set_payload_field(
        &self,
        id: LeafId,
        key: u32,
        value: serde_json::Value,
    ) -> AppResult<LeafRecord> {
        self.inner.set_payload_field(id, key, value).await
    }

    async fn delete_leaf(&self, id: LeafId) -> AppResult<()> {
        self.inner.delete_leaf(id).await
    }

    async fn duplicate_leaf(&self, id: LeafId) -> AppResult<LeafSummary> {
        self.inner.duplicate_leaf(id).await
    }

    async fn try_unlock(&self, guess: &str, reference: &str) -> AppResult<bool> {
        self.inner.try_unlock(guess, reference).await
    }

    async fn is_unlocked(&self, reference: &str) -> AppResult<bool> {
        self.inner.is_unlocked(reference).await
    }
}
