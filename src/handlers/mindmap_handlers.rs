use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::{parse_body, respond, respond_with};
use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::export::ExportFormat;
use crate::models::{CreateMindMapData, CreateNodeData, MindMapFilters, MindMapPatch, NodePatch};
use crate::AppState;

/// Query parameters understood by `/api/mindmaps`. `action` selects the
/// operation; ids always travel in the query string, payloads in the body.
#[derive(Deserialize, Debug, Default)]
pub struct MindMapQuery {
    pub action: Option<String>,
    pub map_id: Option<Uuid>,
    pub node_id: Option<Uuid>,
    pub format: Option<String>,
    pub category_id: Option<Uuid>,
    pub archived: Option<bool>,
    pub search: Option<String>,
}

fn require_map_id(query: &MindMapQuery) -> Result<Uuid, ApiError> {
    query
        .map_id
        .ok_or_else(|| ApiError::InvalidInput("Map ID is required".to_string()))
}

fn require_node_id(query: &MindMapQuery) -> Result<Uuid, ApiError> {
    query
        .node_id
        .ok_or_else(|| ApiError::InvalidInput("Node ID is required".to_string()))
}

/// GET /api/mindmaps: `get`, `list` and `export`.
pub async fn mindmaps_get(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<MindMapQuery>,
) -> Result<Response, ApiError> {
    match query.action.as_deref() {
        Some("get") => {
            let map_id = require_map_id(&query)?;
            let detail = state.service.get_mind_map(map_id, user.user_id).await?;
            respond_with("Mindmap retrieved", &detail)
        }
        Some("list") => {
            let filters = MindMapFilters {
                category_id: query.category_id,
                archived: query.archived,
                search: query.search.clone(),
            };
            let summaries = state.service.list_mind_maps(user.user_id, filters).await?;
            respond_with("Mindmaps retrieved", &summaries)
        }
        Some("export") => {
            let map_id = require_map_id(&query)?;
            let format: ExportFormat = query.format.as_deref().unwrap_or("json").parse()?;
            let bytes = state
                .service
                .export_mind_map(map_id, user.user_id, format)
                .await?;
            let disposition = format!(
                "attachment; filename=\"mindmap_{}.{}\"",
                map_id,
                format.extension()
            );
            let headers = [
                (header::CONTENT_TYPE, format.content_type().to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ];
            Ok((headers, bytes).into_response())
        }
        _ => Err(ApiError::InvalidInput("Invalid action".to_string())),
    }
}

/// POST /api/mindmaps: `create`, `duplicate` and `create-node`.
pub async fn mindmaps_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<MindMapQuery>,
    body: Option<Json<Value>>,
) -> Result<Response, ApiError> {
    let body = body.map(|Json(v)| v).unwrap_or_else(|| json!({}));
    match query.action.as_deref() {
        Some("create") => {
            let data: CreateMindMapData = parse_body(body)?;
            let map_id = state.service.create_mind_map(user.user_id, data).await?;
            info!(map_id = %map_id, user_id = %user.user_id, "Mindmap created");
            respond_with("Mindmap created successfully", &json!({ "map_id": map_id }))
        }
        Some("duplicate") => {
            let title = body
                .get("title")
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or("");
            let map_id = match (query.map_id, title.is_empty()) {
                (Some(map_id), false) => map_id,
                _ => {
                    return Err(ApiError::InvalidInput(
                        "Map ID and title are required".to_string(),
                    ))
                }
            };
            let new_id = state
                .service
                .duplicate_mind_map(map_id, user.user_id, title)
                .await?;
            info!(map_id = %new_id, source_map_id = %map_id, "Mindmap duplicated");
            respond_with("Mindmap duplicated successfully", &json!({ "map_id": new_id }))
        }
        Some("create-node") => {
            let map_id = require_map_id(&query)?;
            let data: CreateNodeData = parse_body(body)?;
            let node_id = state.service.create_node(map_id, user.user_id, data).await?;
            info!(node_id = %node_id, map_id = %map_id, "Node created");
            respond_with("Node created successfully", &json!({ "node_id": node_id }))
        }
        _ => Err(ApiError::InvalidInput("Invalid action".to_string())),
    }
}

/// PUT /api/mindmaps: `update`, `update-node` and `archive`.
pub async fn mindmaps_put(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<MindMapQuery>,
    body: Option<Json<Value>>,
) -> Result<Response, ApiError> {
    let body = body.map(|Json(v)| v).unwrap_or_else(|| json!({}));
    match query.action.as_deref() {
        Some("update") => {
            let map_id = require_map_id(&query)?;
            let patch: MindMapPatch = parse_body(body)?;
            state
                .service
                .update_mind_map(map_id, user.user_id, patch)
                .await?;
            info!(map_id = %map_id, user_id = %user.user_id, "Mindmap updated");
            Ok(respond("Mindmap updated successfully"))
        }
        Some("update-node") => {
            let node_id = require_node_id(&query)?;
            let patch: NodePatch = parse_body(body)?;
            state
                .service
                .update_node(node_id, user.user_id, patch)
                .await?;
            Ok(respond("Node updated successfully"))
        }
        Some("archive") => {
            let map_id = require_map_id(&query)?;
            let archive = body.get("archive").and_then(Value::as_bool).unwrap_or(true);
            state
                .service
                .archive_mind_map(map_id, user.user_id, archive)
                .await?;
            info!(map_id = %map_id, archived = archive, "Mindmap archive state changed");
            let message = if archive {
                "Mindmap archived successfully"
            } else {
                "Mindmap unarchived successfully"
            };
            Ok(respond(message))
        }
        _ => Err(ApiError::InvalidInput("Invalid action".to_string())),
    }
}

/// DELETE /api/mindmaps: `delete` and `delete-node`.
pub async fn mindmaps_delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<MindMapQuery>,
) -> Result<Response, ApiError> {
    match query.action.as_deref() {
        Some("delete") => {
            let map_id = require_map_id(&query)?;
            state.service.delete_mind_map(map_id, user.user_id).await?;
            info!(map_id = %map_id, user_id = %user.user_id, "Mindmap deleted");
            Ok(respond("Mindmap deleted successfully"))
        }
        Some("delete-node") => {
            let node_id = require_node_id(&query)?;
            state.service.delete_node(node_id, user.user_id).await?;
            info!(node_id = %node_id, user_id = %user.user_id, "Node deleted");
            Ok(respond("Node deleted successfully"))
        }
        _ => Err(ApiError::InvalidInput("Invalid action".to_string())),
    }
}
