//! Item kind discriminator for ordered child sequences.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two kinds of children a folder holds, each in its own ordered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// A child folder.
    Folder,
    /// A leaf item (loadout).
    Leaf,
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Folder => write!(f, "folder"),
            Self::Leaf => write!(f, "leaf"),
        }
    }
}
