// tests/node_api.rs
mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::helpers::{
    add_collaborator, count_where, create_map, create_node, create_test_app, map_version,
    register_and_login, send_json,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use uuid::Uuid;

#[sqlx::test]
async fn test_create_node_applies_defaults(pool: SqlitePool) {
    let app = create_test_app(pool);
    let (token, _) = register_and_login(&app, "alice").await;
    let map_id = create_map(&app, &token, "Canvas").await;

    let node_id = create_node(&app, &token, map_id, "First idea", None).await;

    let (_, body) = send_json(
        &app,
        "GET",
        &format!("/api/mindmaps?action=get&map_id={}", map_id),
        Some(&token),
        None,
    )
    .await;
    let nodes = body["data"]["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 1);

    let node = &nodes[0];
    assert_eq!(node["node_id"], node_id.to_string().as_str());
    assert_eq!(node["node_text"], "First idea");
    assert_eq!(node["node_type"], "main");
    assert_eq!(node["position_x"], json!(100.0));
    assert_eq!(node["position_y"], json!(200.0));
    assert_eq!(node["width"], json!(150));
    assert_eq!(node["height"], json!(50));
    assert_eq!(node["color"], "#007bff");
    assert_eq!(node["background_color"], "#ffffff");
    assert_eq!(node["text_color"], "#000000");
    assert_eq!(node["font_size"], json!(14));
    assert_eq!(node["font_weight"], "normal");
    assert_eq!(node["priority"], "medium");
    assert_eq!(node["status"], "pending");
    assert_eq!(node["order_index"], json!(0));
    assert_eq!(node["is_collapsed"], json!(false));
    assert_eq!(node["icon"], Value::Null);
    assert_eq!(node["due_date"], Value::Null);
    assert_eq!(node["tags"], json!([]));
}

#[sqlx::test]
async fn test_create_node_accepts_explicit_fields(pool: SqlitePool) {
    let app = create_test_app(pool);
    let (token, _) = register_and_login(&app, "alice").await;
    let map_id = create_map(&app, &token, "Canvas").await;

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/mindmaps?action=create-node&map_id={}", map_id),
        Some(&token),
        Some(json!({
            "node_text": "Launch checklist",
            "position_x": 420.5,
            "position_y": -30.0,
            "node_type": "task",
            "color": "#ff0000",
            "priority": "high",
            "status": "in_progress",
            "due_date": "2026-09-01",
            "notes": "Talk to ops first",
            "tags": ["launch", "ops"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Node created successfully");

    let (_, body) = send_json(
        &app,
        "GET",
        &format!("/api/mindmaps?action=get&map_id={}", map_id),
        Some(&token),
        None,
    )
    .await;
    let node = &body["data"]["nodes"][0];
    assert_eq!(node["node_type"], "task");
    assert_eq!(node["position_x"], json!(420.5));
    assert_eq!(node["position_y"], json!(-30.0));
    assert_eq!(node["color"], "#ff0000");
    assert_eq!(node["priority"], "high");
    assert_eq!(node["status"], "in_progress");
    assert_eq!(node["due_date"], "2026-09-01");
    assert_eq!(node["notes"], "Talk to ops first");
    assert_eq!(node["tags"], json!(["launch", "ops"]));
}

#[sqlx::test]
async fn test_create_node_requires_text_and_position(pool: SqlitePool) {
    let app = create_test_app(pool);
    let (token, _) = register_and_login(&app, "alice").await;
    let map_id = create_map(&app, &token, "Canvas").await;
    let uri = format!("/api/mindmaps?action=create-node&map_id={}", map_id);

    let (status, body) = send_json(
        &app,
        "POST",
        &uri,
        Some(&token),
        Some(json!({ "node_text": "No position", "position_x": 10.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing required node data");

    let (status, body) = send_json(
        &app,
        "POST",
        &uri,
        Some(&token),
        Some(json!({ "node_text": "  ", "position_x": 10.0, "position_y": 10.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing required node data");

    let (status, body) = send_json(&app, "POST", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing required node data");

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/mindmaps?action=create-node",
        Some(&token),
        Some(json!({ "node_text": "x", "position_x": 1.0, "position_y": 1.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Map ID is required");
}

#[sqlx::test]
async fn test_create_node_validates_parent(pool: SqlitePool) {
    let app = create_test_app(pool);
    let (token, _) = register_and_login(&app, "alice").await;
    let map_id = create_map(&app, &token, "Canvas").await;
    let other_map = create_map(&app, &token, "Other canvas").await;
    let foreign_node = create_node(&app, &token, other_map, "Elsewhere", None).await;

    let uri = format!("/api/mindmaps?action=create-node&map_id={}", map_id);
    let (status, body) = send_json(
        &app,
        "POST",
        &uri,
        Some(&token),
        Some(json!({
            "node_text": "Orphan",
            "position_x": 0.0,
            "position_y": 0.0,
            "parent_id": Uuid::new_v4(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Parent node not found");

    let (status, body) = send_json(
        &app,
        "POST",
        &uri,
        Some(&token),
        Some(json!({
            "node_text": "Confused",
            "position_x": 0.0,
            "position_y": 0.0,
            "parent_id": foreign_node,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Parent node belongs to a different mindmap");
}

#[sqlx::test]
async fn test_node_operations_leave_map_version_alone(pool: SqlitePool) {
    let app = create_test_app(pool.clone());
    let (token, _) = register_and_login(&app, "alice").await;
    let map_id = create_map(&app, &token, "Stable").await;

    let node_id = create_node(&app, &token, map_id, "A thought", None).await;
    send_json(
        &app,
        "PUT",
        &format!("/api/mindmaps?action=update-node&node_id={}", node_id),
        Some(&token),
        Some(json!({ "node_text": "A better thought" })),
    )
    .await;
    send_json(
        &app,
        "DELETE",
        &format!("/api/mindmaps?action=delete-node&node_id={}", node_id),
        Some(&token),
        None,
    )
    .await;

    // Only map-level updates move the version counter.
    assert_eq!(map_version(&pool, map_id).await, 1);
}

#[sqlx::test]
async fn test_update_node_fields_and_tags(pool: SqlitePool) {
    let app = create_test_app(pool.clone());
    let (token, _) = register_and_login(&app, "alice").await;
    let map_id = create_map(&app, &token, "Canvas").await;
    let node_id = create_node(&app, &token, map_id, "Draft", None).await;
    let uri = format!("/api/mindmaps?action=update-node&node_id={}", node_id);

    let (status, body) = send_json(
        &app,
        "PUT",
        &uri,
        Some(&token),
        Some(json!({ "node_text": "Final", "color": "#00ff00", "tags": ["alpha", "beta"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Node updated successfully");

    let get_uri = format!("/api/mindmaps?action=get&map_id={}", map_id);
    let (_, body) = send_json(&app, "GET", &get_uri, Some(&token), None).await;
    let node = &body["data"]["nodes"][0];
    assert_eq!(node["node_text"], "Final");
    assert_eq!(node["color"], "#00ff00");
    assert_eq!(node["tags"], json!(["alpha", "beta"]));

    // Replacing tags drops the old set entirely.
    send_json(
        &app,
        "PUT",
        &uri,
        Some(&token),
        Some(json!({ "tags": ["beta", "gamma", "  "] })),
    )
    .await;
    let (_, body) = send_json(&app, "GET", &get_uri, Some(&token), None).await;
    assert_eq!(body["data"]["nodes"][0]["tags"], json!(["beta", "gamma"]));

    // An empty list clears the node's tags.
    send_json(&app, "PUT", &uri, Some(&token), Some(json!({ "tags": [] }))).await;
    let (_, body) = send_json(&app, "GET", &get_uri, Some(&token), None).await;
    assert_eq!(body["data"]["nodes"][0]["tags"], json!([]));

    // Tag names are global; reuse does not mint duplicates.
    let second = create_node(&app, &token, map_id, "Another", None).await;
    send_json(
        &app,
        "PUT",
        &format!("/api/mindmaps?action=update-node&node_id={}", second),
        Some(&token),
        Some(json!({ "tags": ["beta"] })),
    )
    .await;
    let beta_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE name = 'beta'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(beta_rows, 1);
}

#[sqlx::test]
async fn test_update_node_rejects_empty_patch(pool: SqlitePool) {
    let app = create_test_app(pool);
    let (token, _) = register_and_login(&app, "alice").await;
    let map_id = create_map(&app, &token, "Canvas").await;
    let node_id = create_node(&app, &token, map_id, "Draft", None).await;

    let (status, body) = send_json(
        &app,
        "PUT",
        &format!("/api/mindmaps?action=update-node&node_id={}", node_id),
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No valid fields to update");

    let (status, body) = send_json(
        &app,
        "PUT",
        &format!("/api/mindmaps?action=update-node&node_id={}", Uuid::new_v4()),
        Some(&token),
        Some(json!({ "node_text": "Ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Node not found");
}

#[sqlx::test]
async fn test_node_edits_respect_collaborator_permissions(pool: SqlitePool) {
    let app = create_test_app(pool.clone());
    let (owner_token, _) = register_and_login(&app, "owner").await;
    let (viewer_token, viewer_id) = register_and_login(&app, "viewer").await;
    let (editor_token, editor_id) = register_and_login(&app, "editor").await;

    let map_id = create_map(&app, &owner_token, "Team board").await;
    add_collaborator(&pool, map_id, viewer_id, "view", "accepted").await;
    add_collaborator(&pool, map_id, editor_id, "edit", "accepted").await;
    let node_id = create_node(&app, &owner_token, map_id, "Agenda", None).await;

    // Viewers cannot touch nodes.
    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/mindmaps?action=create-node&map_id={}", map_id),
        Some(&viewer_token),
        Some(json!({ "node_text": "Sneaky", "position_x": 0.0, "position_y": 0.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Access denied");

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/mindmaps?action=update-node&node_id={}", node_id),
        Some(&viewer_token),
        Some(json!({ "node_text": "Hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "DELETE",
        &format!("/api/mindmaps?action=delete-node&node_id={}", node_id),
        Some(&viewer_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Editors can.
    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/mindmaps?action=update-node&node_id={}", node_id),
        Some(&editor_token),
        Some(json!({ "node_text": "Updated agenda" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    create_node(&app, &editor_token, map_id, "Action items", None).await;
}

#[sqlx::test]
async fn test_delete_node_promotes_children_and_drops_connections(pool: SqlitePool) {
    let app = create_test_app(pool.clone());
    let (token, _) = register_and_login(&app, "alice").await;
    let map_id = create_map(&app, &token, "Canvas").await;

    let root = create_node(&app, &token, map_id, "Root", None).await;
    let child = create_node(&app, &token, map_id, "Child", Some(root)).await;
    sqlx::query(
        "INSERT INTO connections (connection_id, from_node_id, to_node_id, label, created_at) \
         VALUES (?, ?, ?, NULL, ?)",
    )
    .bind(Uuid::new_v4())
    .bind(root)
    .bind(child)
    .bind(Utc::now())
    .execute(&pool)
    .await
    .unwrap();

    let (status, body) = send_json(
        &app,
        "DELETE",
        &format!("/api/mindmaps?action=delete-node&node_id={}", root),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Node deleted successfully");

    let (_, body) = send_json(
        &app,
        "GET",
        &format!("/api/mindmaps?action=get&map_id={}", map_id),
        Some(&token),
        None,
    )
    .await;
    let nodes = body["data"]["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 1);
    // The orphaned child is kept and promoted to a root.
    assert_eq!(nodes[0]["node_text"], "Child");
    assert_eq!(nodes[0]["parent_id"], Value::Null);
    assert_eq!(body["data"]["connections"], json!([]));
    assert_eq!(count_where(&pool, "connections", "from_node_id", root).await, 0);
}
