//! Persistent key-space trait backing the local store.

use async_trait::async_trait;

use crate::result::AppResult;

/// A client-local persistent key space (string keys, string values).
///
/// Implementations must report quota-exceeded writes as
/// [`ErrorKind::StorageFull`](crate::error::ErrorKind::StorageFull) and every
/// other write failure as [`ErrorKind::Storage`](crate::error::ErrorKind::Storage).
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the store type name (e.g., "file", "memory").
    fn store_type(&self) -> &str;

    /// Get a value by key.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> AppResult<()>;

    /// Delete a key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check that the store is usable.
    async fn health_check(&self) -> AppResult<bool>;
}
