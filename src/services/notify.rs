use serde_json::Value;
use sqlx::MySqlExecutor;
use sqlx::types::Json;
use tracing::debug;

use crate::model::notification::NotificationType;

/// Store a notification for `user_id`. Callers pass their transaction when
/// the event is part of a larger write.
pub async fn notify(
    executor: impl MySqlExecutor<'_>,
    user_id: u64,
    kind: NotificationType,
    data: Value,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO notifications (user_id, type, data) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(kind.as_ref())
        .bind(Json(data))
        .execute(executor)
        .await?;

    debug!(user_id, kind = %kind, "Notification stored");
    Ok(result.last_insert_id())
}
