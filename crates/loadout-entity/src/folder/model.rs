//! Folder node model.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use loadout_core::error::AppError;
use loadout_core::types::FolderId;

use crate::leaf::LeafSummary;

/// Name given to the root of a freshly created tree.
pub const DEFAULT_ROOT_NAME: &str = "Loadouts";

/// A folder in the loadout hierarchy.
///
/// `is_read_only` is stored per node and never pre-combined with ancestors;
/// see [`crate::folder::tree::effective_read_only`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderNode {
    /// Folder identifier. The root always uses [`FolderId::ROOT`].
    pub id: FolderId,
    /// Folder name.
    pub name: String,
    /// Parent folder; `None` only for the root.
    pub parent_id: Option<FolderId>,
    /// Read-only flag stored on this node only.
    #[serde(default)]
    pub is_read_only: bool,
    /// Ordered child folders.
    #[serde(default)]
    pub children: Vec<Arc<FolderNode>>,
    /// Ordered leaf listing.
    #[serde(default)]
    pub leaves: Vec<LeafSummary>,
}

impl FolderNode {
    /// An empty root folder.
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            id: FolderId::ROOT,
            name: name.into(),
            parent_id: None,
            is_read_only: false,
            children: Vec::new(),
            leaves: Vec::new(),
        }
    }

    /// An empty folder under `parent_id`.
    pub fn new(id: FolderId, name: impl Into<String>, parent_id: FolderId) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id: Some(parent_id),
            is_read_only: false,
            children: Vec::new(),
            leaves: Vec::new(),
        }
    }

    /// Check if this is the root folder.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Whether the folder holds any child folder or leaf.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty() || !self.leaves.is_empty()
    }
}

impl Default for FolderNode {
    fn default() -> Self {
        Self::root(DEFAULT_ROOT_NAME)
    }
}

/// Trim a user-supplied folder or leaf name, rejecting empty results.
pub fn normalize_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("Name must not be empty"));
    }
    Ok(trimmed.to_string())
}
