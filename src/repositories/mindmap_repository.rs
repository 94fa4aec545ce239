use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use uuid::Uuid;

use crate::models::{MindMap, MindMapFilters, MindMapHeader, MindMapPatch, MindMapSummary};

/// Inserts a fully-populated mindmap row.
pub async fn insert_mindmap(
    conn: &mut SqliteConnection,
    mindmap: &MindMap,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO mindmaps (map_id, user_id, title, description, category_id, theme, \
         is_public, canvas_width, canvas_height, zoom_level, center_x, center_y, \
         is_archived, version, created_at, updated_at, last_accessed) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(mindmap.map_id)
    .bind(mindmap.user_id)
    .bind(&mindmap.title)
    .bind(&mindmap.description)
    .bind(mindmap.category_id)
    .bind(&mindmap.theme)
    .bind(mindmap.is_public)
    .bind(mindmap.canvas_width)
    .bind(mindmap.canvas_height)
    .bind(mindmap.zoom_level)
    .bind(mindmap.center_x)
    .bind(mindmap.center_y)
    .bind(mindmap.is_archived)
    .bind(mindmap.version)
    .bind(mindmap.created_at)
    .bind(mindmap.updated_at)
    .bind(mindmap.last_accessed)
    .execute(conn)
    .await?;
    Ok(())
}

/// Fetches a bare mindmap row by id.
pub async fn fetch_mindmap(
    conn: &mut SqliteConnection,
    map_id: Uuid,
) -> Result<Option<MindMap>, sqlx::Error> {
    sqlx::query_as::<_, MindMap>(
        "SELECT map_id, user_id, title, description, category_id, theme, is_public, \
         canvas_width, canvas_height, zoom_level, center_x, center_y, is_archived, \
         version, created_at, updated_at, last_accessed \
         FROM mindmaps WHERE map_id = ?",
    )
    .bind(map_id)
    .fetch_optional(conn)
    .await
}

/// Fetches a mindmap joined with its owner's username and category details.
pub async fn fetch_header(
    conn: &mut SqliteConnection,
    map_id: Uuid,
) -> Result<Option<MindMapHeader>, sqlx::Error> {
    sqlx::query_as::<_, MindMapHeader>(
        "SELECT m.map_id, m.user_id, m.title, m.description, m.category_id, m.theme, \
         m.is_public, m.canvas_width, m.canvas_height, m.zoom_level, m.center_x, m.center_y, \
         m.is_archived, m.version, m.created_at, m.updated_at, m.last_accessed, \
         u.username AS owner_username, c.name AS category_name, c.color AS category_color \
         FROM mindmaps m \
         JOIN users u ON m.user_id = u.user_id \
         LEFT JOIN categories c ON m.category_id = c.category_id \
         WHERE m.map_id = ?",
    )
    .bind(map_id)
    .fetch_optional(conn)
    .await
}

/// Applies an allow-listed patch in a single statement that also refreshes
/// `updated_at` and bumps `version` once. The caller must reject an empty
/// patch first.
pub async fn update_mindmap(
    conn: &mut SqliteConnection,
    map_id: Uuid,
    patch: &MindMapPatch,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE mindmaps SET ");
    let mut fields = builder.separated(", ");
    if let Some(title) = &patch.title {
        fields.push("title = ").push_bind_unseparated(title.as_str());
    }
    if let Some(description) = &patch.description {
        fields
            .push("description = ")
            .push_bind_unseparated(description.as_str());
    }
    if let Some(category_id) = patch.category_id {
        fields
            .push("category_id = ")
            .push_bind_unseparated(category_id);
    }
    if let Some(theme) = &patch.theme {
        fields.push("theme = ").push_bind_unseparated(theme.as_str());
    }
    if let Some(is_public) = patch.is_public {
        fields.push("is_public = ").push_bind_unseparated(is_public);
    }
    if let Some(canvas_width) = patch.canvas_width {
        fields
            .push("canvas_width = ")
            .push_bind_unseparated(canvas_width);
    }
    if let Some(canvas_height) = patch.canvas_height {
        fields
            .push("canvas_height = ")
            .push_bind_unseparated(canvas_height);
    }
    if let Some(zoom_level) = patch.zoom_level {
        fields
            .push("zoom_level = ")
            .push_bind_unseparated(zoom_level);
    }
    if let Some(center_x) = patch.center_x {
        fields.push("center_x = ").push_bind_unseparated(center_x);
    }
    if let Some(center_y) = patch.center_y {
        fields.push("center_y = ").push_bind_unseparated(center_y);
    }
    fields.push("updated_at = ").push_bind_unseparated(now);
    fields.push("version = version + 1");
    builder.push(" WHERE map_id = ").push_bind(map_id);

    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn set_archived(
    conn: &mut SqliteConnection,
    map_id: Uuid,
    archived: bool,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE mindmaps SET is_archived = ?, updated_at = ? WHERE map_id = ?")
        .bind(archived)
        .bind(now)
        .bind(map_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn touch_last_accessed(
    conn: &mut SqliteConnection,
    map_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE mindmaps SET last_accessed = ? WHERE map_id = ?")
        .bind(now)
        .bind(map_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Deletes a mindmap. Nodes, connections, tag links and collaborator
/// grants go with it through the foreign key cascade.
pub async fn delete_mindmap(
    conn: &mut SqliteConnection,
    map_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM mindmaps WHERE map_id = ?")
        .bind(map_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Number of non-archived mindmaps a user owns; compared against the
/// subscription limit before creation and duplication.
pub async fn count_active_for_user(
    conn: &mut SqliteConnection,
    user_id: Uuid,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM mindmaps WHERE user_id = ? AND is_archived = 0",
    )
    .bind(user_id)
    .fetch_one(conn)
    .await
}

/// Lists mindmaps the user owns or collaborates on (accepted grants only),
/// newest change first. The permission column is computed: "owner" for
/// owned maps, otherwise the collaborator permission.
pub async fn list_for_user(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    filters: &MindMapFilters,
) -> Result<Vec<MindMapSummary>, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT m.map_id, m.title, m.description, u.username AS owner_username, \
         m.category_id, c.name AS category_name, c.color AS category_color, \
         m.theme, m.is_public, m.is_archived, m.version, m.created_at, m.updated_at, \
         m.last_accessed, \
         CASE WHEN m.user_id = ",
    );
    builder.push_bind(user_id);
    builder.push(
        " THEN 'owner' ELSE COALESCE(col.permission, 'view') END AS permission, \
         (SELECT COUNT(*) FROM nodes n WHERE n.map_id = m.map_id) AS node_count \
         FROM mindmaps m \
         JOIN users u ON m.user_id = u.user_id \
         LEFT JOIN categories c ON m.category_id = c.category_id \
         LEFT JOIN collaborators col ON col.map_id = m.map_id AND col.status = 'accepted' \
         AND col.user_id = ",
    );
    builder.push_bind(user_id);
    builder.push(" WHERE (m.user_id = ");
    builder.push_bind(user_id);
    builder.push(" OR col.user_id IS NOT NULL)");

    builder.push(" AND m.is_archived = ");
    builder.push_bind(filters.archived.unwrap_or(false));
    if let Some(category_id) = filters.category_id {
        builder.push(" AND m.category_id = ");
        builder.push_bind(category_id);
    }
    if let Some(search) = &filters.search {
        let pattern = format!("%{}%", search.to_lowercase());
        builder.push(" AND (LOWER(m.title) LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR LOWER(m.description) LIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    builder.push(" ORDER BY m.updated_at DESC");

    builder
        .build_query_as::<MindMapSummary>()
        .fetch_all(conn)
        .await
}
