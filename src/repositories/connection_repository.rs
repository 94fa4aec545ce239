use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::models::Connection;

/// Inserts a connection between two nodes of the same map.
pub async fn insert_connection(
    conn: &mut SqliteConnection,
    connection: &Connection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO connections (connection_id, from_node_id, to_node_id, label, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(connection.connection_id)
    .bind(connection.from_node_id)
    .bind(connection.to_node_id)
    .bind(&connection.label)
    .bind(connection.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Fetches every connection whose endpoints both live in the given map.
pub async fn fetch_for_map(
    conn: &mut SqliteConnection,
    map_id: Uuid,
) -> Result<Vec<Connection>, sqlx::Error> {
    sqlx::query_as::<_, Connection>(
        "SELECT co.connection_id, co.from_node_id, co.to_node_id, co.label, co.created_at \
         FROM connections co \
         JOIN nodes nf ON co.from_node_id = nf.node_id \
         JOIN nodes nt ON co.to_node_id = nt.node_id \
         WHERE nf.map_id = ? AND nt.map_id = ? \
         ORDER BY co.created_at",
    )
    .bind(map_id)
    .bind(map_id)
    .fetch_all(conn)
    .await
}

pub async fn delete_connection(
    conn: &mut SqliteConnection,
    connection_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM connections WHERE connection_id = ?")
        .bind(connection_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
