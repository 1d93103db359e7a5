//! # loadout-store
//!
//! Store backends for the loadout tree. [`TreeBackend`] is the single
//! mutation contract; [`LocalTreeBackend`] persists into a client-local key
//! space and [`RemoteTreeBackend`] forwards to the authoritative service.
//! [`BackendManager`] picks one of them from configuration at session start.

pub mod backend;
pub mod kv;
pub mod local;
pub mod manager;
#[cfg(feature = "remote")]
pub mod remote;
pub mod unlock;

pub use backend::TreeBackend;
pub use kv::{FileKeyValueStore, MemoryKeyValueStore};
pub use local::LocalTreeBackend;
pub use manager::BackendManager;
#[cfg(feature = "remote")]
pub use remote::RemoteTreeBackend;
pub use unlock::UnlockGate;
