pub mod mindmap_handlers;
pub mod user_handlers;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Uniform response envelope shared by every API endpoint.
#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiResponse {
    pub fn success(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// 200 envelope without a data payload.
pub(crate) fn respond(message: &str) -> Response {
    Json(ApiResponse::success(message, None)).into_response()
}

/// 200 envelope carrying a serialized data payload.
pub(crate) fn respond_with<T: Serialize>(message: &str, data: &T) -> Result<Response, ApiError> {
    let value = serde_json::to_value(data)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to serialize response: {}", e)))?;
    Ok(Json(ApiResponse::success(message, Some(value))).into_response())
}

/// Deserializes an action body, reporting unusable bodies as 400.
pub(crate) fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body)
        .map_err(|e| ApiError::InvalidInput(format!("Invalid request body: {}", e)))
}

/// Fallback for HTTP methods an API route does not support.
pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ApiResponse::failure("Method not allowed")),
    )
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
