use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::handlers::ApiResponse;

/// Error type shared by the service layer and the HTTP handlers. Domain
/// failures render as 400 with their message in the response envelope;
/// storage and internal failures render as 500 with the details kept out
/// of the response body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    LimitExceeded(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(_)
            | ApiError::LimitExceeded(_)
            | ApiError::InvalidInput(_)
            | ApiError::UnsupportedFormat(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::AccessDenied(_) => {
                warn!(reason = %self, "Request denied");
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Database(e) => {
                error!(error = %e, "Database error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Internal(e) => {
                error!(error = %e, "Internal error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ApiResponse::failure(message))).into_response()
    }
}
