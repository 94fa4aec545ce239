use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::models::{CollabPermission, CollabStatus, CollaboratorInfo};

/// Inserts or refreshes a collaborator grant for (map, user).
pub async fn upsert_collaborator(
    conn: &mut SqliteConnection,
    map_id: Uuid,
    user_id: Uuid,
    permission: CollabPermission,
    status: CollabStatus,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO collaborators (map_id, user_id, permission, status, created_at) \
         VALUES (?, ?, ?, ?, ?) \
         ON CONFLICT (map_id, user_id) \
         DO UPDATE SET permission = excluded.permission, status = excluded.status",
    )
    .bind(map_id)
    .bind(user_id)
    .bind(permission)
    .bind(status)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

/// Permission of an accepted grant, if the user has one on this map.
/// Pending invitations grant nothing.
pub async fn find_accepted(
    conn: &mut SqliteConnection,
    map_id: Uuid,
    user_id: Uuid,
) -> Result<Option<CollabPermission>, sqlx::Error> {
    sqlx::query_scalar::<_, CollabPermission>(
        "SELECT permission FROM collaborators \
         WHERE map_id = ? AND user_id = ? AND status = 'accepted'",
    )
    .bind(map_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await
}

/// Accepted collaborators of a map with their account details.
pub async fn fetch_accepted_for_map(
    conn: &mut SqliteConnection,
    map_id: Uuid,
) -> Result<Vec<CollaboratorInfo>, sqlx::Error> {
    sqlx::query_as::<_, CollaboratorInfo>(
        "SELECT col.user_id, u.username, u.email, col.permission, col.status, col.created_at \
         FROM collaborators col \
         JOIN users u ON col.user_id = u.user_id \
         WHERE col.map_id = ? AND col.status = 'accepted' \
         ORDER BY col.created_at",
    )
    .bind(map_id)
    .fetch_all(conn)
    .await
}

pub async fn remove_collaborator(
    conn: &mut SqliteConnection,
    map_id: Uuid,
    user_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM collaborators WHERE map_id = ? AND user_id = ?")
        .bind(map_id)
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
