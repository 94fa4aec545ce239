use axum::{
    extract::{Query, State},
    response::Response,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::respond_with;
use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::RegisterUserData;
use crate::AppState;

#[derive(Deserialize, Debug, Default)]
pub struct AuthQuery {
    pub action: Option<String>,
}

/// POST /api/auth: `register` and `login`. Neither requires a token.
pub async fn auth_post(
    State(state): State<AppState>,
    Query(query): Query<AuthQuery>,
    body: Option<Json<Value>>,
) -> Result<Response, ApiError> {
    let body = body.map(|Json(v)| v).unwrap_or_else(|| json!({}));
    match query.action.as_deref() {
        Some("register") => {
            // Missing fields surface as the service's validation message,
            // not a deserialization error.
            let data = RegisterUserData {
                username: string_field(&body, "username"),
                email: string_field(&body, "email"),
                password: string_field(&body, "password"),
            };
            let user = state.service.register_user(data).await?;
            info!(user_id = %user.user_id, username = %user.username, "User registered");
            respond_with(
                "User registered successfully",
                &json!({ "user_id": user.user_id }),
            )
        }
        Some("login") => {
            let username = string_field(&body, "username");
            let password = string_field(&body, "password");
            let login = state.service.login_user(&username, &password).await?;
            info!(user_id = %login.user.user_id, "User logged in");
            respond_with("Login successful", &login)
        }
        _ => Err(ApiError::InvalidInput("Invalid action".to_string())),
    }
}

/// GET /api/auth: `profile`.
pub async fn auth_get(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<AuthQuery>,
) -> Result<Response, ApiError> {
    match query.action.as_deref() {
        Some("profile") => {
            let profile = state.service.user_profile(user.user_id).await?;
            respond_with("Profile retrieved", &profile)
        }
        _ => Err(ApiError::InvalidInput("Invalid action".to_string())),
    }
}

fn string_field(body: &Value, key: &str) -> String {
    body.get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}
