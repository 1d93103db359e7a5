//! # loadout-entity
//!
//! Domain model of the loadout tree. A tree is a plain nested value rooted at
//! a single [`FolderNode`]; child folders are held behind `Arc` so every
//! transform in [`folder::tree`] rebuilds only the path it touches and shares
//! the rest with its input. Old roots stay valid, which is what makes
//! snapshot and rollback a pointer swap.

pub mod folder;
pub mod leaf;

pub use folder::{
    CascadeDelete, ClonedSubtree, DeleteSummary, DuplicateFolderSummary, FolderNode,
};
pub use leaf::{LeafRecord, LeafSummary, Payload};
