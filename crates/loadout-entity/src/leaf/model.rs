//! Leaf record and its denormalized folder listing entry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use loadout_core::types::{FolderId, LeafId};

/// Opaque automation payload keyed by small integers.
///
/// The engine copies and stores it but never interprets the values.
pub type Payload = BTreeMap<u32, serde_json::Value>;

/// A leaf entry as listed inside its folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafSummary {
    /// Leaf identifier.
    pub id: LeafId,
    /// Display name.
    pub name: String,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Excluded from folder cascade deletes.
    pub is_protected: bool,
}

/// The full leaf item, stored separately from the tree and keyed by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafRecord {
    /// Leaf identifier.
    pub id: LeafId,
    /// Display name.
    pub name: String,
    /// The folder whose listing holds this leaf.
    pub folder_id: FolderId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Excluded from folder cascade deletes.
    pub is_protected: bool,
    /// Opaque payload.
    #[serde(default)]
    pub payload: Payload,
}

impl LeafRecord {
    /// Create an unprotected record stamped with `now`.
    pub fn new(
        id: LeafId,
        name: impl Into<String>,
        folder_id: FolderId,
        payload: Payload,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            folder_id,
            created_at: now,
            updated_at: now,
            is_protected: false,
            payload,
        }
    }

    /// The listing entry for this record.
    pub fn summary(&self) -> LeafSummary {
        LeafSummary {
            id: self.id,
            name: self.name.clone(),
            updated_at: self.updated_at,
            is_protected: self.is_protected,
        }
    }
}

/// Name given to a duplicated item.
pub fn copy_name(name: &str) -> String {
    format!("{name} (copy)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_mirrors_record() {
        let now = Utc::now();
        let mut record = LeafRecord::new(LeafId(-4), "Farm", FolderId(-1), Payload::new(), now);
        record.is_protected = true;

        let summary = record.summary();
        assert_eq!(summary.id, LeafId(-4));
        assert_eq!(summary.name, "Farm");
        assert_eq!(summary.updated_at, now);
        assert!(summary.is_protected);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let mut payload = Payload::new();
        payload.insert(3, serde_json::json!({"1": 7}));
        let record = LeafRecord::new(LeafId(2), "Ruins", FolderId::ROOT, payload, Utc::now());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["folderId"], 0);
        assert_eq!(value["isProtected"], false);
        assert_eq!(value["payload"]["3"]["1"], 7);

        let back: LeafRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_copy_name() {
        assert_eq!(copy_name("Boss rush"), "Boss rush (copy)");
    }
}
