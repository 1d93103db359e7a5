//! Shared value types used across all loadout crates.

pub mod id;
pub mod item;

pub use id::{FolderId, LeafId};
pub use item::ItemType;
