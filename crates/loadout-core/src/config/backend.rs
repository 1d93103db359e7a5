//! Store backend configuration.

use serde::{Deserialize, Serialize};

/// Top-level backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend mode: `"local"` (guest, client-only), `"memory"` or `"remote"`.
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Local persistent store settings.
    #[serde(default)]
    pub local: LocalStoreConfig,
    /// Remote service settings.
    #[serde(default)]
    pub remote: RemoteBackendConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            local: LocalStoreConfig::default(),
            remote: RemoteBackendConfig::default(),
        }
    }
}

/// Local persistent store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStoreConfig {
    /// Directory holding the persisted key space.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Key of the serialized `{folderTree, leafRecordsById, nextId}` record.
    #[serde(default = "default_record_key")]
    pub record_key: String,
    /// Key of the persisted unlock set.
    #[serde(default = "default_unlock_key")]
    pub unlock_key: String,
    /// Byte quota over all stored values; `0` disables the quota.
    #[serde(default)]
    pub quota_bytes: u64,
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            record_key: default_record_key(),
            unlock_key: default_unlock_key(),
            quota_bytes: 0,
        }
    }
}

/// Remote service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteBackendConfig {
    /// Base URL of the loadout service.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token sent with every request, if any.
    #[serde(default)]
    pub token: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for RemoteBackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_mode() -> String {
    "local".to_string()
}

fn default_data_dir() -> String {
    "data/local".to_string()
}

fn default_record_key() -> String {
    "loadout_tree".to_string()
}

fn default_unlock_key() -> String {
    "loadout_unlocks".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout() -> u64 {
    10
}
