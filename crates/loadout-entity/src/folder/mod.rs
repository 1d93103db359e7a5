//! Folder domain entities.

pub mod cascade;
pub mod model;
pub mod summary;
pub mod tree;

pub use cascade::{CascadeDelete, ClonedSubtree, cascade_delete, clone_subtree};
pub use model::{FolderNode, normalize_name};
pub use summary::{DeleteSummary, DuplicateFolderSummary};
