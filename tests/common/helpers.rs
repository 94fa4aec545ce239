// tests/common/helpers.rs
//! Shared helper functions for integration tests

use axum::{
    body::Body,
    http::{self, HeaderMap, Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::ServiceExt;
use uuid::Uuid;

use mindmap_server::{config::Config, create_router};

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        server_port: 0,
        token_key: "test-token-key".to_string(),
        token_ttl_seconds: 3600,
        max_mindmaps_free: 3,
        max_mindmaps_premium: 50,
        max_mindmaps_enterprise: -1,
    }
}

pub fn create_test_app(pool: SqlitePool) -> Router {
    create_router(pool, test_config())
}

/// Sends one JSON request and returns the status with the parsed envelope.
pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());
    if let Some(token) = token {
        request = request.header(http::header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Sends a request and hands back the raw response parts, for endpoints
/// that do not answer with the JSON envelope.
pub async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, HeaderMap, Vec<u8>) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(http::header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let response = app
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec();
    (status, headers, bytes)
}

/// Registers an account and logs in, returning the bearer token and user id.
pub async fn register_and_login(app: &Router, username: &str) -> (String, Uuid) {
    let (status, body) = send_json(
        app,
        "POST",
        "/api/auth?action=register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "hunter42",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {}", body);

    let (status, body) = send_json(
        app,
        "POST",
        "/api/auth?action=login",
        None,
        Some(json!({ "username": username, "password": "hunter42" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);

    let token = body["data"]["token"].as_str().unwrap().to_string();
    let user_id = body["data"]["user"]["user_id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    (token, user_id)
}

/// Creates a mindmap and returns its id.
pub async fn create_map(app: &Router, token: &str, title: &str) -> Uuid {
    let (status, body) = send_json(
        app,
        "POST",
        "/api/mindmaps?action=create",
        Some(token),
        Some(json!({ "title": title })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create map failed: {}", body);
    body["data"]["map_id"].as_str().unwrap().parse().unwrap()
}

/// Creates a node at a fixed position and returns its id.
pub async fn create_node(
    app: &Router,
    token: &str,
    map_id: Uuid,
    text: &str,
    parent_id: Option<Uuid>,
) -> Uuid {
    let mut payload = json!({
        "node_text": text,
        "position_x": 100.0,
        "position_y": 200.0,
    });
    if let Some(parent_id) = parent_id {
        payload["parent_id"] = json!(parent_id);
    }

    let (status, body) = send_json(
        app,
        "POST",
        &format!("/api/mindmaps?action=create-node&map_id={}", map_id),
        Some(token),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create node failed: {}", body);
    body["data"]["node_id"].as_str().unwrap().parse().unwrap()
}

/// Flips an account's subscription tier directly in the database.
pub async fn set_subscription(pool: &SqlitePool, user_id: Uuid, tier: &str) {
    sqlx::query("UPDATE users SET subscription_type = ? WHERE user_id = ?")
        .bind(tier)
        .bind(user_id)
        .execute(pool)
        .await
        .expect("failed to set subscription tier");
}

/// Inserts a collaborator grant directly in the database.
pub async fn add_collaborator(
    pool: &SqlitePool,
    map_id: Uuid,
    user_id: Uuid,
    permission: &str,
    status: &str,
) {
    sqlx::query(
        "INSERT INTO collaborators (map_id, user_id, permission, status, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(map_id)
    .bind(user_id)
    .bind(permission)
    .bind(status)
    .bind(Utc::now())
    .execute(pool)
    .await
    .expect("failed to add collaborator");
}

/// Reads a map's version counter straight from the database.
pub async fn map_version(pool: &SqlitePool, map_id: Uuid) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT version FROM mindmaps WHERE map_id = ?")
        .bind(map_id)
        .fetch_one(pool)
        .await
        .expect("map row missing")
}

/// Counts rows in a table whose `column` matches the given id.
pub async fn count_where(pool: &SqlitePool, table: &str, column: &str, id: Uuid) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = ?", table, column);
    sqlx::query_scalar::<_, i64>(&sql)
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("count query failed")
}

/// Latest audit actions recorded for a user, oldest first.
pub async fn recorded_actions(pool: &SqlitePool, user_id: Uuid) -> Vec<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT action FROM activity_log WHERE user_id = ? ORDER BY log_id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .expect("activity query failed")
}
