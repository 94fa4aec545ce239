use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use uuid::Uuid;

use crate::models::{Node, NodePatch};

/// Inserts a fully-populated node row.
pub async fn insert_node(conn: &mut SqliteConnection, node: &Node) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO nodes (node_id, map_id, parent_id, node_text, node_type, \
         position_x, position_y, width, height, color, background_color, text_color, \
         font_size, font_weight, icon, image_url, priority, status, due_date, notes, \
         order_index, is_collapsed, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(node.node_id)
    .bind(node.map_id)
    .bind(node.parent_id)
    .bind(&node.node_text)
    .bind(&node.node_type)
    .bind(node.position_x)
    .bind(node.position_y)
    .bind(node.width)
    .bind(node.height)
    .bind(&node.color)
    .bind(&node.background_color)
    .bind(&node.text_color)
    .bind(node.font_size)
    .bind(&node.font_weight)
    .bind(&node.icon)
    .bind(&node.image_url)
    .bind(&node.priority)
    .bind(&node.status)
    .bind(node.due_date)
    .bind(&node.notes)
    .bind(node.order_index)
    .bind(node.is_collapsed)
    .bind(node.created_at)
    .bind(node.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Fetches a single node by id.
pub async fn fetch_node(
    conn: &mut SqliteConnection,
    node_id: Uuid,
) -> Result<Option<Node>, sqlx::Error> {
    sqlx::query_as::<_, Node>(
        "SELECT node_id, map_id, parent_id, node_text, node_type, position_x, position_y, \
         width, height, color, background_color, text_color, font_size, font_weight, \
         icon, image_url, priority, status, due_date, notes, order_index, is_collapsed, \
         created_at, updated_at \
         FROM nodes WHERE node_id = ?",
    )
    .bind(node_id)
    .fetch_optional(conn)
    .await
}

/// Fetches every node of a map in display order.
pub async fn fetch_nodes_for_map(
    conn: &mut SqliteConnection,
    map_id: Uuid,
) -> Result<Vec<Node>, sqlx::Error> {
    sqlx::query_as::<_, Node>(
        "SELECT node_id, map_id, parent_id, node_text, node_type, position_x, position_y, \
         width, height, color, background_color, text_color, font_size, font_weight, \
         icon, image_url, priority, status, due_date, notes, order_index, is_collapsed, \
         created_at, updated_at \
         FROM nodes WHERE map_id = ? \
         ORDER BY order_index, created_at",
    )
    .bind(map_id)
    .fetch_all(conn)
    .await
}

/// Applies an allow-listed patch and refreshes the node's `updated_at`.
/// Node edits never touch the owning map's version counter. The caller
/// must reject an empty patch first.
pub async fn update_node(
    conn: &mut SqliteConnection,
    node_id: Uuid,
    patch: &NodePatch,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE nodes SET ");
    let mut fields = builder.separated(", ");
    if let Some(node_text) = &patch.node_text {
        fields
            .push("node_text = ")
            .push_bind_unseparated(node_text.as_str());
    }
    if let Some(node_type) = &patch.node_type {
        fields
            .push("node_type = ")
            .push_bind_unseparated(node_type.as_str());
    }
    if let Some(color) = &patch.color {
        fields.push("color = ").push_bind_unseparated(color.as_str());
    }
    if let Some(background_color) = &patch.background_color {
        fields
            .push("background_color = ")
            .push_bind_unseparated(background_color.as_str());
    }
    if let Some(text_color) = &patch.text_color {
        fields
            .push("text_color = ")
            .push_bind_unseparated(text_color.as_str());
    }
    if let Some(position_x) = patch.position_x {
        fields
            .push("position_x = ")
            .push_bind_unseparated(position_x);
    }
    if let Some(position_y) = patch.position_y {
        fields
            .push("position_y = ")
            .push_bind_unseparated(position_y);
    }
    if let Some(width) = patch.width {
        fields.push("width = ").push_bind_unseparated(width);
    }
    if let Some(height) = patch.height {
        fields.push("height = ").push_bind_unseparated(height);
    }
    if let Some(font_size) = patch.font_size {
        fields.push("font_size = ").push_bind_unseparated(font_size);
    }
    if let Some(font_weight) = &patch.font_weight {
        fields
            .push("font_weight = ")
            .push_bind_unseparated(font_weight.as_str());
    }
    if let Some(icon) = &patch.icon {
        fields.push("icon = ").push_bind_unseparated(icon.as_str());
    }
    if let Some(image_url) = &patch.image_url {
        fields
            .push("image_url = ")
            .push_bind_unseparated(image_url.as_str());
    }
    if let Some(priority) = &patch.priority {
        fields
            .push("priority = ")
            .push_bind_unseparated(priority.as_str());
    }
    if let Some(status) = &patch.status {
        fields
            .push("status = ")
            .push_bind_unseparated(status.as_str());
    }
    if let Some(due_date) = patch.due_date {
        fields.push("due_date = ").push_bind_unseparated(due_date);
    }
    if let Some(notes) = &patch.notes {
        fields.push("notes = ").push_bind_unseparated(notes.as_str());
    }
    if let Some(order_index) = patch.order_index {
        fields
            .push("order_index = ")
            .push_bind_unseparated(order_index);
    }
    if let Some(is_collapsed) = patch.is_collapsed {
        fields
            .push("is_collapsed = ")
            .push_bind_unseparated(is_collapsed);
    }
    fields.push("updated_at = ").push_bind_unseparated(now);
    builder.push(" WHERE node_id = ").push_bind(node_id);

    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

/// Fixes up a copied node's parent reference during duplication.
pub async fn set_parent(
    conn: &mut SqliteConnection,
    node_id: Uuid,
    parent_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE nodes SET parent_id = ? WHERE node_id = ?")
        .bind(parent_id)
        .bind(node_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Deletes a node. Its children are promoted to roots by the parent
/// foreign key's SET NULL; connections and tag links cascade away.
pub async fn delete_node(conn: &mut SqliteConnection, node_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM nodes WHERE node_id = ?")
        .bind(node_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
