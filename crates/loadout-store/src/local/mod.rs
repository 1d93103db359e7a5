//! Local persistent backend.
//!
//! The whole tree lives in one serialized [`LocalRecord`] under a single key
//! of a client-local [`KeyValueStore`]. The record is read once, cached, and
//! replaced only after the updated copy was written successfully.

pub mod record;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use loadout_core::config::backend::LocalStoreConfig;
use loadout_core::error::AppError;
use loadout_core::result::AppResult;
use loadout_core::traits::KeyValueStore;
use loadout_core::types::{FolderId, ItemType, LeafId};
use loadout_entity::{
    DeleteSummary, DuplicateFolderSummary, FolderNode, LeafRecord, LeafSummary, Payload,
};

use crate::backend::TreeBackend;
use crate::unlock::UnlockGate;

pub use record::LocalRecord;

/// Backend persisting into a client-local key space.
#[derive(Debug)]
pub struct LocalTreeBackend {
    /// The key space.
    store: Arc<dyn KeyValueStore>,
    /// Key of the serialized record.
    record_key: String,
    /// Cached record; `None` until first use.
    state: Arc<Mutex<Option<LocalRecord>>>,
    /// Fuzzy unlock gate sharing the key space.
    unlocks: UnlockGate,
}

impl LocalTreeBackend {
    /// Create a backend over `store` using the configured keys.
    pub fn new(store: Arc<dyn KeyValueStore>, config: &LocalStoreConfig) -> Self {
        let unlocks = UnlockGate::new(Arc::clone(&store), config.unlock_key.clone());
        Self {
            store,
            record_key: config.record_key.clone(),
            state: Arc::new(Mutex::new(None)),
            unlocks,
        }
    }

    /// Read the persisted record, falling back to a fresh one.
    async fn fetch(&self) -> LocalRecord {
        let raw = match self.store.get(&self.record_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return LocalRecord::fresh(),
            Err(e) => {
                warn!(key = %self.record_key, error = %e, "Local tree unreadable, starting fresh");
                return LocalRecord::fresh();
            }
        };

        let parsed = serde_json::from_str::<LocalRecord>(&raw)
            .map_err(AppError::from)
            .and_then(|record| record.validate().map(|()| record));
        match parsed {
            Ok(record) => record,
            Err(e) => {
                warn!(key = %self.record_key, error = %e, "Local tree corrupt, starting fresh");
                LocalRecord::fresh()
            }
        }
    }

    /// Run a read-only closure against the current record.
    async fn read<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&LocalRecord) -> AppResult<T>,
    {
        let mut guard = self.state.lock().await;
        if guard.is_none() {
            *guard = Some(self.fetch().await);
        }
        match guard.as_ref() {
            Some(record) => f(record),
            None => Err(AppError::internal("Local tree not loaded")),
        }
    }

    /// Apply `f` to a copy of the record and persist it.
    ///
    /// The cached record is swapped only after the write succeeded, so a
    /// failed operation or a failed write changes nothing. The write and the
    /// swap run in their own task holding the lock, so a caller that stops
    /// waiting cannot leave the cache behind the persisted record.
    async fn mutate<T, F>(&self, op: &'static str, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut LocalRecord) -> AppResult<T>,
    {
        let mut guard = Arc::clone(&self.state).lock_owned().await;
        let mut next = match guard.as_ref() {
            Some(record) => record.clone(),
            None => self.fetch().await,
        };

        let out = f(&mut next)?;
        let raw = serde_json::to_string(&next)?;

        let store = Arc::clone(&self.store);
        let key = self.record_key.clone();
        let write = tokio::spawn(async move {
            store.set(&key, &raw).await?;
            debug!(op, bytes = raw.len(), next_id = next.next_id, "Persisted local tree");
            *guard = Some(next);
            Ok::<(), AppError>(())
        });
        write
            .await
            .map_err(|e| AppError::internal(format!("Local tree write aborted: {e}")))??;

        Ok(out)
    }
}

#[async_trait]
impl TreeBackend for LocalTreeBackend {
    fn backend_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.store.health_check().await
    }

    async fn get_tree(&self) -> AppResult<Arc<FolderNode>> {
        self.read(|record| Ok(Arc::clone(&record.folder_tree))).await
    }

    async fn get_leaf(&self, id: LeafId) -> AppResult<LeafRecord> {
        self.read(|record| record.leaf(id).cloned()).await
    }

    async fn create_folder(&self, name: &str, parent_id: FolderId) -> AppResult<FolderId> {
        let id = self
            .mutate("create_folder", |record| record.create_folder(name, parent_id))
            .await?;
        info!(folder_id = %id, parent_id = %parent_id, "Folder created");
        Ok(id)
    }

    async fn rename_folder(&self, id: FolderId, name: &str) -> AppResult<()> {
        self.mutate("rename_folder", |record| record.rename_folder(id, name))
            .await?;
        info!(folder_id = %id, name, "Folder renamed");
        Ok(())
    }

    async fn move_folder(&self, id: FolderId, target_parent_id: FolderId) -> AppResult<()> {
        self.mutate("move_folder", |record| {
            record.move_folder(id, target_parent_id)
        })
        .await?;
        info!(folder_id = %id, target_parent_id = %target_parent_id, "Folder moved");
        Ok(())
    }

    async fn set_read_only(&self, id: FolderId, value: bool) -> AppResult<()> {
        self.mutate("set_read_only", |record| record.set_read_only(id, value))
            .await?;
        info!(folder_id = %id, read_only = value, "Folder read-only flag set");
        Ok(())
    }

    async fn delete_folder(&self, id: FolderId, force: bool) -> AppResult<DeleteSummary> {
        let summary = self
            .mutate("delete_folder", |record| {
                record.delete_folder(id, force, Utc::now())
            })
            .await?;
        info!(
            folder_id = %id,
            folders_deleted = summary.folders_deleted,
            loadouts_deleted = summary.loadouts_deleted,
            protected_loadouts_moved = summary.protected_loadouts_moved,
            "Folder deleted"
        );
        Ok(summary)
    }

    async fn duplicate_folder(&self, id: FolderId) -> AppResult<DuplicateFolderSummary> {
        let summary = self
            .mutate("duplicate_folder", |record| {
                record.duplicate_folder(id, Utc::now())
            })
            .await?;
        info!(
            folder_id = %id,
            copy_id = %summary.folder.id,
            folders_copied = summary.folders_copied,
            leaves_copied = summary.leaves_copied,
            "Folder duplicated"
        );
        Ok(summary)
    }

    async fn reorder(
        &self,
        folder_id: FolderId,
        item_type: ItemType,
        ordered_ids: &[i64],
    ) -> AppResult<()> {
        self.mutate("reorder", |record| {
            record.reorder(folder_id, item_type, ordered_ids)
        })
        .await?;
        info!(
            folder_id = %folder_id,
            item_type = %item_type,
            count = ordered_ids.len(),
            "Children reordered"
        );
        Ok(())
    }

    async fn create_leaf(
        &self,
        name: &str,
        folder_id: FolderId,
        payload: Payload,
    ) -> AppResult<LeafRecord> {
        let record = self
            .mutate("create_leaf", |record| {
                record.create_leaf(name, folder_id, payload, Utc::now())
            })
            .await?;
        info!(leaf_id = %record.id, folder_id = %folder_id, "Loadout created");
        Ok(record)
    }

    async fn rename_leaf(&self, id: LeafId, name: &str) -> AppResult<()> {
        self.mutate("rename_leaf", |record| {
            record.rename_leaf(id, name, Utc::now())
        })
        .await?;
        info!(leaf_id = %id, name, "Loadout renamed");
        Ok(())
    }

    async fn move_leaf(&self, id: LeafId, target_folder_id: FolderId) -> AppResult<()> {
        self.mutate("move_leaf", |record| {
            record.move_leaf(id, target_folder_id, Utc::now())
        })
        .await?;
        info!(leaf_id = %id, target_folder_id = %target_folder_id, "Loadout moved");
        Ok(())
    }

    async fn set_leaf_protected(&self, id: LeafId, value: bool) -> AppResult<()> {
        self.mutate("set_leaf_protected", |record| {
            record.set_leaf_protected(id, value, Utc::now())
        })
        .await?;
        info!(leaf_id = %id, protected = value, "Loadout protection set");
        Ok(())
    }

    async fn set_payload_field(
        &self,
        id: LeafId,
        key: u32,
        value: serde_json::Value,
    ) -> AppResult<LeafRecord> {
        let record = self
            .mutate("set_payload_field", |record| {
                record.set_payload_field(id, key, value, Utc::now())
            })
            .await?;
        debug!(leaf_id = %id, key, "Loadout field stored");
        Ok(record)
    }

    async fn delete_leaf(&self, id: LeafId) -> AppResult<()> {
        self.mutate("delete_leaf", |record| record.delete_leaf(id))
            .await?;
        info!(leaf_id = %id, "Loadout deleted");
        Ok(())
    }

    async fn duplicate_leaf(&self, id: LeafId) -> AppResult<LeafSummary> {
        let summary = self
            .mutate("duplicate_leaf", |record| {
                record.duplicate_leaf(id, Utc::now())
            })
            .await?;
        info!(leaf_id = %id, copy_id = %summary.id, "Loadout duplicated");
        Ok(summary)
    }

    async fn try_unlock(&self, guess: &str, reference: &str) -> AppResult<bool> {
        self.unlocks.try_unlock(guess, reference).await
    }

    async fn is_unlocked(&self, reference: &str) -> AppResult<bool> {
        self.unlocks.is_unlocked(reference).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{FileKeyValueStore, MemoryKeyValueStore};
    use loadout_core::ErrorKind;
    use loadout_entity::folder::tree;

    fn memory_backend(quota: u64) -> (Arc<dyn KeyValueStore>, LocalTreeBackend) {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new(quota));
        let backend = LocalTreeBackend::new(Arc::clone(&store), &LocalStoreConfig::default());
        (store, backend)
    }

    async fn open_file_backend(config: &LocalStoreConfig) -> LocalTreeBackend {
        let store = FileKeyValueStore::new(&config.data_dir, 0).await.unwrap();
        LocalTreeBackend::new(Arc::new(store), config)
    }

    #[tokio::test]
    async fn test_fresh_tree() {
        let (_, backend) = memory_backend(0);
        let tree = backend.get_tree().await.unwrap();
        assert!(tree.is_root());
        assert_eq!(tree.id, FolderId::ROOT);
        assert_eq!(tree.name, "Loadouts");
        assert!(!tree.has_children());
    }

    #[tokio::test]
    async fn test_delete_reports_cascade_summary() {
        let (_, backend) = memory_backend(0);
        let a = backend.create_folder("A", FolderId::ROOT).await.unwrap();
        backend
            .create_leaf("L", a, Payload::new())
            .await
            .unwrap();

        let summary = backend.delete_folder(a, true).await.unwrap();
        assert_eq!(
            summary,
            DeleteSummary {
                folders_deleted: 1,
                loadouts_deleted: 1,
                protected_loadouts_moved: 0,
            }
        );
        let tree = backend.get_tree().await.unwrap();
        assert!(tree.children.is_empty());
        assert!(tree.leaves.is_empty());
    }

    #[tokio::test]
    async fn test_persists_between_instances() {
        let dir = tempfile::tempdir().unwrap();
        let config = LocalStoreConfig {
            data_dir: dir.path().to_string_lossy().into_owned(),
            ..LocalStoreConfig::default()
        };
        let first = open_file_backend(&config).await;
        let folder = first.create_folder("Raids", FolderId::ROOT).await.unwrap();
        let leaf = first
            .create_leaf("Boss", folder, Payload::new())
            .await
            .unwrap();
        drop(first);

        let second = open_file_backend(&config).await;
        let record = second.get_leaf(leaf.id).await.unwrap();
        assert_eq!(record.folder_id, folder);
        // the counter survives a reload
        let next = second.create_folder("More", FolderId::ROOT).await.unwrap();
        assert_eq!(next, FolderId(-3));
    }

    #[tokio::test]
    async fn test_corrupt_data_falls_back_to_fresh_tree() {
        let (store, backend) = memory_backend(0);
        store.set("loadout_tree", "{ not json").await.unwrap();
        let tree = backend.get_tree().await.unwrap();
        assert!(!tree.has_children());

        // structurally inconsistent data is treated the same way
        let (store, backend) = memory_backend(0);
        store
            .set(
                "loadout_tree",
                r#"{"folderTree":{"id":0,"name":"R","parentId":null},"leafRecordsById":{},"nextId":5}"#,
            )
            .await
            .unwrap();
        assert_eq!(backend.get_tree().await.unwrap().name, "Loadouts");
    }

    #[tokio::test]
    async fn test_storage_full_leaves_state_unchanged() {
        let (_, backend) = memory_backend(400);
        let mut created = 0;
        let err = loop {
            match backend
                .create_folder(&format!("Folder number {created}"), FolderId::ROOT)
                .await
            {
                Ok(_) => created += 1,
                Err(e) => break e,
            }
        };
        assert_eq!(err.kind, ErrorKind::StorageFull);
        assert!(err.user_message().contains("Free space"));

        let tree = backend.get_tree().await.unwrap();
        assert_eq!(tree.children.len(), created);
        // the failed create did not consume an id
        let ids: Vec<i64> = tree.children.iter().map(|c| c.id.get()).collect();
        let expected: Vec<i64> = (1..=created as i64).map(|n| -n).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_failed_operation_does_not_persist() {
        let (_, backend) = memory_backend(0);
        let a = backend.create_folder("A", FolderId::ROOT).await.unwrap();
        let b = backend.create_folder("B", a).await.unwrap();
        let before = backend.get_tree().await.unwrap();

        let err = backend.move_folder(a, b).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidMove);
        assert_eq!(backend.get_tree().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_ids_never_collide_with_remote_range() {
        let (_, backend) = memory_backend(0);
        let f = backend.create_folder("F", FolderId::ROOT).await.unwrap();
        let l = backend.create_leaf("L", f, Payload::new()).await.unwrap();
        let dup = backend.duplicate_folder(f).await.unwrap();
        let tree = backend.get_tree().await.unwrap();

        assert!(f.is_local() && l.id.is_local() && dup.folder.id.is_local());
        for id in tree::folder_ids(&tree).into_iter().filter(|id| !id.is_root()) {
            assert!(id.is_local());
        }
        for id in tree::leaf_ids(&tree) {
            assert!(id.is_local());
        }
    }

    /// Saves immediately, acknowledges late.
    #[derive(Debug)]
    struct LateAckStore(MemoryKeyValueStore);

    #[async_trait]
    impl KeyValueStore for LateAckStore {
        fn store_type(&self) -> &str {
            "late-ack"
        }

        async fn get(&self, key: &str) -> AppResult<Option<String>> {
            self.0.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> AppResult<()> {
            self.0.set(key, value).await?;
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Ok(())
        }

        async fn delete(&self, key: &str) -> AppResult<()> {
            self.0.delete(key).await
        }

        async fn health_check(&self) -> AppResult<bool> {
            Ok(true)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_write_still_updates_cache() {
        let store: Arc<dyn KeyValueStore> = Arc::new(LateAckStore(MemoryKeyValueStore::new(0)));
        let config = LocalStoreConfig::default();
        let backend = LocalTreeBackend::new(Arc::clone(&store), &config);
        let a = backend.create_folder("A", FolderId::ROOT).await.unwrap();

        let abandoned = tokio::time::timeout(
            std::time::Duration::from_millis(10),
            backend.rename_folder(a, "Renamed"),
        )
        .await;
        assert!(abandoned.is_err());

        let cached = backend.get_tree().await.unwrap();
        let persisted = LocalTreeBackend::new(store, &config).get_tree().await.unwrap();
        assert_eq!(tree::find_folder(&cached, a).unwrap().name, "Renamed");
        assert_eq!(cached, persisted);

        // the next write builds on the renamed record
        backend.create_folder("B", FolderId::ROOT).await.unwrap();
        let tree = backend.get_tree().await.unwrap();
        assert_eq!(tree::find_folder(&tree, a).unwrap().name, "Renamed");
    }

    #[tokio::test]
    async fn test_unlock_gate() {
        let (_, backend) = memory_backend(0);
        assert!(!backend.try_unlock("ancint runes", "Ancient Ruins").await.unwrap());
        assert!(backend.try_unlock("ancient ruin", "Ancient Ruins").await.unwrap());
        assert!(backend.is_unlocked("Ancient Ruins").await.unwrap());
    }
}
