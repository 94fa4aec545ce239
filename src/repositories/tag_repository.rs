use sqlx::SqliteConnection;
use uuid::Uuid;

/// Resolves a tag by exact name, creating it on first use. Tags are
/// global; the same name on two maps is the same tag.
pub async fn get_or_create_tag(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Uuid, sqlx::Error> {
    let existing = sqlx::query_scalar::<_, Uuid>("SELECT tag_id FROM tags WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(tag_id) = existing {
        return Ok(tag_id);
    }

    let tag_id = Uuid::new_v4();
    sqlx::query("INSERT INTO tags (tag_id, name) VALUES (?, ?)")
        .bind(tag_id)
        .bind(name)
        .execute(conn)
        .await?;
    Ok(tag_id)
}

/// Replaces a node's entire tag set: delete all links, then re-link the
/// given names. Blank names are skipped, duplicates collapse.
pub async fn replace_node_tags(
    conn: &mut SqliteConnection,
    node_id: Uuid,
    names: &[String],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM node_tags WHERE node_id = ?")
        .bind(node_id)
        .execute(&mut *conn)
        .await?;

    for name in names {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let tag_id = get_or_create_tag(&mut *conn, name).await?;
        sqlx::query("INSERT OR IGNORE INTO node_tags (node_id, tag_id) VALUES (?, ?)")
            .bind(node_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Tag names for every node of a map, one row per (node, tag) pair.
pub async fn tags_for_map(
    conn: &mut SqliteConnection,
    map_id: Uuid,
) -> Result<Vec<(Uuid, String)>, sqlx::Error> {
    sqlx::query_as::<_, (Uuid, String)>(
        "SELECT nt.node_id, t.name \
         FROM node_tags nt \
         JOIN tags t ON nt.tag_id = t.tag_id \
         JOIN nodes n ON nt.node_id = n.node_id \
         WHERE n.map_id = ? \
         ORDER BY t.name",
    )
    .bind(map_id)
    .fetch_all(conn)
    .await
}

/// Tag names of a single node.
pub async fn tags_for_node(
    conn: &mut SqliteConnection,
    node_id: Uuid,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT t.name FROM node_tags nt \
         JOIN tags t ON nt.tag_id = t.tag_id \
         WHERE nt.node_id = ? \
         ORDER BY t.name",
    )
    .bind(node_id)
    .fetch_all(conn)
    .await
}

/// Copies the tag links of one node onto another; used by duplication.
pub async fn copy_node_tags(
    conn: &mut SqliteConnection,
    from_node_id: Uuid,
    to_node_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT OR IGNORE INTO node_tags (node_id, tag_id) \
         SELECT ?, tag_id FROM node_tags WHERE node_id = ?",
    )
    .bind(to_node_id)
    .bind(from_node_id)
    .execute(conn)
    .await?;
    Ok(())
}
