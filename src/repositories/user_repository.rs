use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::models::{User, UserStatistics};

/// Inserts a fully-populated user row.
pub async fn insert_user(conn: &mut SqliteConnection, user: &User) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (user_id, username, email, password_hash, subscription_type, \
         is_active, created_at, last_login) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user.user_id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.subscription_type)
    .bind(user.is_active)
    .bind(user.created_at)
    .bind(user.last_login)
    .execute(conn)
    .await?;
    Ok(())
}

/// Fetches a user by id.
pub async fn find_by_id(
    conn: &mut SqliteConnection,
    user_id: Uuid,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT user_id, username, email, password_hash, subscription_type, is_active, \
         created_at, last_login \
         FROM users WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await
}

/// Fetches an active user by username or email; used by login.
pub async fn find_active_by_identifier(
    conn: &mut SqliteConnection,
    identifier: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT user_id, username, email, password_hash, subscription_type, is_active, \
         created_at, last_login \
         FROM users WHERE (username = ? OR email = ?) AND is_active = 1",
    )
    .bind(identifier)
    .bind(identifier)
    .fetch_optional(conn)
    .await
}

/// True when either the username or the email is already registered.
pub async fn identifier_taken(
    conn: &mut SqliteConnection,
    username: &str,
    email: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? OR email = ?)",
    )
    .bind(username)
    .bind(email)
    .fetch_one(conn)
    .await
}

pub async fn touch_last_login(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET last_login = ? WHERE user_id = ?")
        .bind(now)
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Usage counters for the profile endpoint.
pub async fn fetch_statistics(
    conn: &mut SqliteConnection,
    user_id: Uuid,
) -> Result<UserStatistics, sqlx::Error> {
    sqlx::query_as::<_, UserStatistics>(
        "SELECT \
         (SELECT COUNT(*) FROM mindmaps WHERE user_id = ? AND is_archived = 0) AS total_mindmaps, \
         (SELECT COUNT(*) FROM mindmaps WHERE user_id = ? AND is_public = 1) AS public_mindmaps, \
         (SELECT COUNT(*) FROM collaborators WHERE user_id = ? AND status = 'accepted') AS collaborations",
    )
    .bind(user_id)
    .bind(user_id)
    .bind(user_id)
    .fetch_one(conn)
    .await
}
