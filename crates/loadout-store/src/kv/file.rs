//! File-per-key persistent key space.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use loadout_core::error::{AppError, ErrorKind};
use loadout_core::result::AppResult;
use loadout_core::traits::KeyValueStore;

use super::check_quota;

const VALUE_EXT: &str = "json";

/// Key space stored as one file per key under a root directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// failed write never leaves a truncated value behind.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    /// Directory holding the value files.
    root: PathBuf,
    /// Byte quota over all values; `0` disables it.
    quota_bytes: u64,
}

impl FileKeyValueStore {
    /// Open (creating if needed) a key space rooted at `root_path`.
    pub async fn new(root_path: &str, quota_bytes: u64) -> AppResult<Self> {
        let root = PathBuf::from(root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create data directory: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root, quota_bytes })
    }

    /// Resolve a key to its value file.
    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(AppError::validation(format!("Invalid storage key: '{key}'")));
        }
        Ok(self.root.join(format!("{key}.{VALUE_EXT}")))
    }

    /// Total bytes held by value files other than `exclude`.
    async fn used_bytes_except(&self, exclude: &Path) -> AppResult<u64> {
        let mut total = 0;
        let mut entries = fs::read_dir(&self.root).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to list data directory", e)
        })?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path == exclude || path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXT) {
                continue;
            }
            total += entry.metadata().await?.len();
        }
        Ok(total)
    }

    /// Total bytes held by all value files.
    pub async fn used_bytes(&self) -> AppResult<u64> {
        self.used_bytes_except(Path::new("")).await
    }
}

fn write_error(key: &str, err: std::io::Error) -> AppError {
    if err.kind() == std::io::ErrorKind::StorageFull {
        AppError::with_source(
            ErrorKind::StorageFull,
            format!("No space left writing '{key}'"),
            err,
        )
    } else {
        AppError::with_source(ErrorKind::Storage, format!("Failed to write '{key}'"), err)
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    fn store_type(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let path = self.resolve(key)?;
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to read '{key}'"),
                e,
            )),
        }
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let path = self.resolve(key)?;
        let others = self.used_bytes_except(&path).await?;
        check_quota(key, others, value.len() as u64, self.quota_bytes)?;

        let tmp = path.with_extension("tmp");
        if let Err(e) = fs::write(&tmp, value).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(write_error(key, e));
        }
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| write_error(key, e))?;

        debug!(key, bytes = value.len(), "Wrote value file");
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete '{key}'"),
                e,
            )),
        }
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self.root.is_dir())
    }
}
