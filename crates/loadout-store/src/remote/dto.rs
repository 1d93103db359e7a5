//! Wire bodies for the remote loadout service.

use serde::{Deserialize, Serialize};

use loadout_core::types::{FolderId, ItemType};
use loadout_entity::Payload;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateFolderRequest<'a> {
    pub name: &'a str,
    pub parent_id: FolderId,
}

#[derive(Debug, Serialize)]
pub(crate) struct RenameRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MoveFolderRequest {
    pub target_parent_id: FolderId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReadOnlyRequest {
    pub is_read_only: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReorderRequest<'a> {
    pub item_type: ItemType,
    pub ordered_ids: &'a [i64],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateLeafRequest<'a> {
    pub name: &'a str,
    pub folder_id: FolderId,
    pub payload: &'a Payload,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MoveLeafRequest {
    pub target_folder_id: FolderId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProtectRequest {
    pub is_protected: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct PayloadFieldRequest {
    pub key: u32,
    pub value: serde_json::Value,
}

/// `{id}` returned by folder creation.
#[derive(Debug, Deserialize)]
pub(crate) struct CreatedResponse {
    pub id: FolderId,
}

/// Error body returned by the service on failure.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub message: String,
}
