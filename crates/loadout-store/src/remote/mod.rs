//! Remote backend talking JSON over HTTP to the authoritative service.

mod dto;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use loadout_core::config::backend::RemoteBackendConfig;
use loadout_core::error::{AppError, ErrorKind};
use loadout_core::result::AppResult;
use loadout_core::types::{FolderId, ItemType, LeafId};
use loadout_entity::{
    DeleteSummary, DuplicateFolderSummary, FolderNode, LeafRecord, LeafSummary, Payload,
};

use crate::backend::TreeBackend;

use self::dto::{
    CreateFolderRequest, CreateLeafRequest, CreatedResponse, ErrorBody, MoveFolderRequest,
    MoveLeafRequest, PayloadFieldRequest, ProtectRequest, ReadOnlyRequest, RenameRequest,
    ReorderRequest,
};

/// Backend forwarding every operation to the loadout service.
#[derive(Debug, Clone)]
pub struct RemoteTreeBackend {
    /// Shared HTTP client.
    client: Client,
    /// Service base URL without a trailing slash.
    base_url: String,
    /// Bearer token, if configured.
    token: Option<String>,
}

impl RemoteTreeBackend {
    /// Create a remote backend from configuration.
    pub fn new(config: &RemoteBackendConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{path}", self.base_url));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn dispatch(&self, builder: RequestBuilder) -> AppResult<Response> {
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), body = %body, "Loadout service returned an error");
        Err(response_error(status, &body))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> AppResult<T> {
        let response = self.dispatch(builder).await?;
        response.json::<T>().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                "Unexpected response body from loadout service",
                e,
            )
        })
    }

    async fn send_empty(&self, builder: RequestBuilder) -> AppResult<()> {
        self.dispatch(builder).await.map(|_| ())
    }
}

/// Map a failure to reach the service.
fn transport_error(err: reqwest::Error) -> AppError {
    if err.is_connect() || err.is_timeout() {
        AppError::with_source(ErrorKind::Unavailable, "Loadout service unreachable", err)
    } else {
        AppError::with_source(
            ErrorKind::ExternalService,
            "Request to loadout service failed",
            err,
        )
    }
}

/// Map a non-success response to the shared taxonomy.
///
/// A `{error, message}` body with a known code wins; otherwise the status
/// decides.
fn response_error(status: StatusCode, body: &str) -> AppError {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body)
        && let Some(kind) = ErrorKind::from_code(&parsed.error)
    {
        return AppError::new(kind, parsed.message);
    }
    let kind = match status {
        StatusCode::NOT_FOUND => ErrorKind::NotFound,
        StatusCode::CONFLICT => ErrorKind::InvalidMove,
        StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::InvalidOrder,
        StatusCode::INSUFFICIENT_STORAGE => ErrorKind::StorageFull,
        StatusCode::SERVICE_UNAVAILABLE => ErrorKind::Unavailable,
        _ => ErrorKind::ExternalService,
    };
    AppError::new(kind, format!("Loadout service returned {status}"))
}

#[async_trait]
impl TreeBackend for RemoteTreeBackend {
    fn backend_type(&self) -> &str {
        "remote"
    }

    async fn health_check(&self) -> AppResult<bool> {
        match self.send_empty(self.request(Method::GET, "/api/tree")).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind == ErrorKind::Unavailable => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_tree(&self) -> AppResult<Arc<FolderNode>> {
        let tree: FolderNode = self.send(self.request(Method::GET, "/api/tree")).await?;
        Ok(Arc::new(tree))
    }

    async fn get_leaf(&self, id: LeafId) -> AppResult<LeafRecord> {
        self.send(self.request(Method::GET, &format!("/api/loadouts/{id}")))
            .await
    }

    async fn create_folder(&self, name: &str, parent_id: FolderId) -> AppResult<FolderId> {
        let body = CreateFolderRequest { name, parent_id };
        let created: CreatedResponse = self
            .send(self.request(Method::POST, "/api/folders").json(&body))
            .await?;
        info!(folder_id = %created.id, parent_id = %parent_id, "Folder created remotely");
        Ok(created.id)
    }

    async fn rename_folder(&self, id: FolderId, name: &str) -> AppResult<()> {
        let body = RenameRequest { name };
        self.send_empty(
            self.request(Method::PATCH, &format!("/api/folders/{id}"))
                .json(&body),
        )
        .await
    }

    async fn move_folder(&self, id: FolderId, target_parent_id: FolderId) -> AppResult<()> {
        let body = MoveFolderRequest { target_parent_id };
        self.send_empty(
            self.request(Method::POST, &format!("/api/folders/{id}/move"))
                .json(&body),
        )
        .await
    }

    async fn set_read_only(&self, id: FolderId, value: bool) -> AppResult<()> {
        let body = ReadOnlyRequest {
            is_read_only: value,
        };
        self.send_empty(
            self.request(Method::PATCH, &format!("/api/folders/{id}"))
                .json(&body),
        )
        .await
    }

    async fn delete_folder(&self, id: FolderId, force: bool) -> AppResult<DeleteSummary> {
        let summary: DeleteSummary = self
            .send(self.request(Method::DELETE, &format!("/api/folders/{id}?force={force}")))
            .await?;
        info!(folder_id = %id, folders_deleted = summary.folders_deleted, "Folder deleted remotely");
        Ok(summary)
    }

    async fn duplicate_folder(&self, id: FolderId) -> AppResult<DuplicateFolderSummary> {
        self.send(self.request(Method::POST, &format!("/api/folders/{id}/duplicate")))
            .await
    }

    async fn reorder(
        &self,
        folder_id: FolderId,
        item_type: ItemType,
        ordered_ids: &[i64],
    ) -> AppResult<()> {
        let body = ReorderRequest {
            item_type,
            ordered_ids,
        };
        self.send_empty(
            self.request(Method::POST, &format!("/api/folders/{folder_id}/reorder"))
                .json(&body),
        )
        .await
    }

    async fn create_leaf(
        &self,
        name: &str,
        folder_id: FolderId,
        payload: Payload,
    ) -> AppResult<LeafRecord> {
        let body = CreateLeafRequest {
            name,
            folder_id,
            payload: &payload,
        };
        self.send(self.request(Method::POST, "/api/loadouts").json(&body))
            .await
    }

    async fn rename_leaf(&self, id: LeafId, name: &str) -> AppResult<()> {
        let body = RenameRequest { name };
        self.send_empty(
            self.request(Method::PATCH, &format!("/api/loadouts/{id}"))
                .json(&body),
        )
        .await
    }

    async fn move_leaf(&self, id: LeafId, target_folder_id: FolderId) -> AppResult<()> {
        let body = MoveLeafRequest { target_folder_id };
        self.send_empty(
            self.request(Method::POST, &format!("/api/loadouts/{id}/move"))
                .json(&body),
        )
        .await
    }

    async fn set_leaf_protected(&self, id: LeafId, value: bool) -> AppResult<()> {
        let body = ProtectRequest {
            is_protected: value,
        };
        self.send_empty(
            self.request(Method::PATCH, &format!("/api/loadouts/{id}"))
                .json(&body),
        )
        .await
    }

    async fn set_payload_field(
        &self,
        id: LeafId,
        key: u32,
        value: serde_json::Value,
    ) -> AppResult<LeafRecord> {
        let body = PayloadFieldRequest { key, value };
        self.send(
            self.request(Method::PATCH, &format!("/api/loadouts/{id}/payload"))
                .json(&body),
        )
        .await
    }

    async fn delete_leaf(&self, id: LeafId) -> AppResult<()> {
        self.send_empty(self.request(Method::DELETE, &format!("/api/loadouts/{id}")))
            .await
    }

    async fn duplicate_leaf(&self, id: LeafId) -> AppResult<LeafSummary> {
        self.send(self.request(Method::POST, &format!("/api/loadouts/{id}/duplicate")))
            .await
    }

    async fn try_unlock(&self, _guess: &str, _reference: &str) -> AppResult<bool> {
        Err(AppError::unavailable(
            "The unlock gate is only available in guest mode",
        ))
    }

    async fn is_unlocked(&self, _reference: &str) -> AppResult<bool> {
        Err(AppError::unavailable(
            "The unlock gate is only available in guest mode",
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::Json;
    use axum::Router;
    use axum::extract::{Path, Query};
    use axum::http::HeaderMap;
    use axum::response::{IntoResponse, Response as AxumResponse};
    use axum::routing::{delete, get, post};
    use serde_json::json;

    use super::*;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn backend(base_url: &str, token: Option<&str>) -> RemoteTreeBackend {
        RemoteTreeBackend::new(&RemoteBackendConfig {
            base_url: format!("{base_url}/"),
            token: token.map(str::to_string),
            timeout_seconds: 5,
        })
        .unwrap()
    }

    async fn tree() -> Json<serde_json::Value> {
        Json(json!({
            "id": 0,
            "name": "Loadouts",
            "parentId": null,
            "isReadOnly": false,
            "children": [
                {"id": 3, "name": "Raids", "parentId": 0, "isReadOnly": true}
            ],
            "leaves": [
                {"id": 9, "name": "Farm", "updatedAt": "2024-01-01T00:00:00Z", "isProtected": false}
            ]
        }))
    }

    async fn create_folder(headers: HeaderMap, Json(body): Json<serde_json::Value>) -> AxumResponse {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer secret");
        if !authorized {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        if body["parentId"] != 0 {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "NOT_FOUND", "message": "Folder missing"})),
            )
                .into_response();
        }
        Json(json!({"id": 7})).into_response()
    }

    async fn delete_folder(
        Path(id): Path<i64>,
        Query(query): Query<HashMap<String, String>>,
    ) -> AxumResponse {
        if query.get("force").map(String::as_str) != Some("true") {
            return (
                StatusCode::CONFLICT,
                Json(json!({"error": "NOT_EMPTY", "message": format!("Folder {id} has contents")})),
            )
                .into_response();
        }
        Json(json!({"foldersDeleted": 2, "leavesDeleted": 1, "protectedLeavesMoved": 1}))
            .into_response()
    }

    async fn reorder() -> AxumResponse {
        (StatusCode::UNPROCESSABLE_ENTITY, "bad order").into_response()
    }

    async fn move_leaf() -> StatusCode {
        StatusCode::NO_CONTENT
    }

    fn app() -> Router {
        Router::new()
            .route("/api/tree", get(tree))
            .route("/api/folders", post(create_folder))
            .route("/api/folders/{id}", delete(delete_folder))
            .route("/api/folders/{id}/reorder", post(reorder))
            .route("/api/loadouts/{id}/move", post(move_leaf))
    }

    #[tokio::test]
    async fn test_get_tree() {
        let url = serve(app()).await;
        let tree = backend(&url, None).get_tree().await.unwrap();
        assert_eq!(tree.children[0].id, FolderId(3));
        assert!(tree.children[0].is_read_only);
        assert_eq!(tree.leaves[0].id, LeafId(9));
    }

    #[tokio::test]
    async fn test_create_folder_sends_token() {
        let url = serve(app()).await;

        let id = backend(&url, Some("secret"))
            .create_folder("Raids", FolderId::ROOT)
            .await
            .unwrap();
        assert_eq!(id, FolderId(7));

        let err = backend(&url, None)
            .create_folder("Raids", FolderId::ROOT)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExternalService);
    }

    #[tokio::test]
    async fn test_error_body_code_wins_over_status() {
        let url = serve(app()).await;
        let remote = backend(&url, Some("secret"));

        let err = remote.create_folder("x", FolderId(-4)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.message, "Folder missing");

        let err = remote.delete_folder(FolderId(3), false).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotEmpty);
    }

    #[tokio::test]
    async fn test_delete_summary_parsed() {
        let url = serve(app()).await;
        let summary = backend(&url, None)
            .delete_folder(FolderId(3), true)
            .await
            .unwrap();
        assert_eq!(summary.folders_deleted, 2);
        assert_eq!(summary.loadouts_deleted, 1);
        assert_eq!(summary.protected_loadouts_moved, 1);
    }

    #[tokio::test]
    async fn test_status_fallback_and_empty_success() {
        let url = serve(app()).await;
        let remote = backend(&url, None);

        let err = remote
            .reorder(FolderId(3), ItemType::Leaf, &[1, 2])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOrder);

        remote.move_leaf(LeafId(9), FolderId(3)).await.unwrap();

        // no route
        let err = remote.get_leaf(LeafId(9)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let remote = backend(&format!("http://{addr}"), None);
        let err = remote.get_tree().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unavailable);
        assert!(err.is_retryable());
        assert!(!remote.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_unlock_gate_unavailable() {
        let remote = backend("http://127.0.0.1:9", None);
        let err = remote.try_unlock("a", "a").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unavailable);
    }

    #[test]
    fn test_response_error_mapping() {
        assert_eq!(
            response_error(StatusCode::INSUFFICIENT_STORAGE, "").kind,
            ErrorKind::StorageFull
        );
        assert_eq!(
            response_error(StatusCode::SERVICE_UNAVAILABLE, "<html>").kind,
            ErrorKind::Unavailable
        );
        assert_eq!(
            response_error(StatusCode::BAD_REQUEST, r#"{"error":"WEIRD"}"#).kind,
            ErrorKind::ExternalService
        );
        assert_eq!(
            response_error(
                StatusCode::BAD_REQUEST,
                r#"{"error":"INVALID_MOVE","message":"cycle"}"#
            )
            .kind,
            ErrorKind::InvalidMove
        );
    }
}
