//! In-memory key space.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use loadout_core::result::AppResult;
use loadout_core::traits::KeyValueStore;

use super::check_quota;

/// In-memory key space backed by a `DashMap`.
///
/// Holds nothing across process restarts.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    /// Stored values.
    entries: Arc<DashMap<String, String>>,
    /// Byte quota over all values; `0` disables it.
    quota_bytes: u64,
}

impl MemoryKeyValueStore {
    /// Create an empty store with an optional byte quota.
    pub fn new(quota_bytes: u64) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            quota_bytes,
        }
    }

    /// Total bytes held.
    pub fn used_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.value().len() as u64).sum()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    fn store_type(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let others: u64 = self
            .entries
            .iter()
            .filter(|e| e.key() != key)
            .map(|e| e.value().len() as u64)
            .sum();
        check_quota(key, others, value.len() as u64, self.quota_bytes)?;
        self.entries.insert(key.to_string(), value.to_string());
        debug!(key, bytes = value.len(), "Stored value in memory");
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadout_core::ErrorKind;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryKeyValueStore::new(0);
        assert_eq!(store.get("tree").await.unwrap(), None);

        store.set("tree", "{}").await.unwrap();
        assert_eq!(store.get("tree").await.unwrap().as_deref(), Some("{}"));

        store.delete("tree").await.unwrap();
        assert_eq!(store.get("tree").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_quota_counts_other_keys_only() {
        let store = MemoryKeyValueStore::new(10);
        store.set("a", "12345").await.unwrap();
        // overwriting a key does not double count it
        store.set("a", "1234567").await.unwrap();
        store.set("b", "123").await.unwrap();

        let err = store.set("b", "1234").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::StorageFull);
        assert_eq!(store.get("b").await.unwrap().as_deref(), Some("123"));
        assert_eq!(store.used_bytes(), 10);
    }
}
