use chrono::Utc;
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

/// Append-only audit sink backed by the `activity_log` table.
#[derive(Clone)]
pub struct ActivityLog {
    pool: SqlitePool,
}

impl ActivityLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Records one audit entry. A failed write is logged and swallowed;
    /// auditing must never fail the operation it describes.
    pub async fn record(
        &self,
        user_id: Uuid,
        action: &str,
        target_id: Option<Uuid>,
        details: Option<serde_json::Value>,
    ) {
        let details_text = details.map(|d| d.to_string());
        let result = sqlx::query(
            "INSERT INTO activity_log (user_id, action, target_id, details, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(action)
        .bind(target_id)
        .bind(details_text)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!(error = %e, action = action, user_id = %user_id, "Failed to record activity");
        }
    }
}
