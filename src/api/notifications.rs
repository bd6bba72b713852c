use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::debug;
use utoipa::IntoParams;

use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::notification::Notification;

const NOTIFICATION_COLUMNS: &str = "id, user_id, type, data, read_at, created_at";

#[derive(Debug, Deserialize, IntoParams)]
pub struct NotificationQuery {
    /// Only notifications that have not been read
    pub unread_only: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    params(NotificationQuery),
    responses((status = 200, description = "The caller's notifications, newest first", body = [Notification])),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn notification_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<NotificationQuery>,
) -> AppResult<HttpResponse> {
    let mut sql = format!(
        "SELECT {} FROM notifications WHERE user_id = ?",
        NOTIFICATION_COLUMNS
    );
    if query.unread_only.unwrap_or(false) {
        sql.push_str(" AND read_at IS NULL");
    }
    sql.push_str(" ORDER BY created_at DESC, id DESC");

    let notifications = sqlx::query_as::<_, Notification>(&sql)
        .bind(auth.user_id)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "data": notifications })))
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    responses((status = 200, description = "Unread notification count", body = Object, example = json!({ "count": 3 }))),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn unread_count(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND read_at IS NULL",
    )
    .bind(auth.user_id)
    .fetch_one(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "count": count })))
}

/// Owner check shared by read and delete. A missing id is a 404, someone
/// else's notification a 403.
async fn fetch_owned(pool: &MySqlPool, auth: &AuthUser, id: u64) -> AppResult<Notification> {
    let notification = sqlx::query_as::<_, Notification>(&format!(
        "SELECT {} FROM notifications WHERE id = ?",
        NOTIFICATION_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Notification not found"))?;

    if notification.user_id != auth.user_id {
        return Err(AppError::forbidden("You are not allowed to access this notification"));
    }
    Ok(notification)
}

#[utoipa::path(
    put,
    path = "/api/notifications/{notification_id}/read",
    params(("notification_id" = u64, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked as read"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_read(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let notification = fetch_owned(pool.get_ref(), &auth, path.into_inner()).await?;

    if !notification.is_read() {
        sqlx::query("UPDATE notifications SET read_at = NOW() WHERE id = ? AND user_id = ?")
            .bind(notification.id)
            .bind(auth.user_id)
            .execute(pool.get_ref())
            .await?;
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Notification marked as read" })))
}

#[utoipa::path(
    put,
    path = "/api/notifications/read-all",
    responses((status = 200, description = "All notifications marked as read")),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_all_read(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    let result = sqlx::query(
        "UPDATE notifications SET read_at = NOW() WHERE user_id = ? AND read_at IS NULL",
    )
    .bind(auth.user_id)
    .execute(pool.get_ref())
    .await?;

    debug!(user_id = auth.user_id, marked = result.rows_affected(), "Notifications marked read");

    Ok(HttpResponse::Ok().json(json!({
        "message": "All notifications marked as read",
        "updated": result.rows_affected(),
    })))
}

#[utoipa::path(
    delete,
    path = "/api/notifications/{notification_id}",
    params(("notification_id" = u64, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn delete_notification(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let notification = fetch_owned(pool.get_ref(), &auth, path.into_inner()).await?;

    sqlx::query("DELETE FROM notifications WHERE id = ?")
        .bind(notification.id)
        .execute(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Notification deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test, web::Data};
    use serde_json::{Value, json};

    use crate::auth::jwt::testing::sign;
    use crate::config::Config;
    use crate::db::testing::{insert_officer, test_pool};
    use crate::model::notification::NotificationType;
    use crate::models::TokenType;
    use crate::routes;
    use crate::services::notify::notify;

    #[actix_web::test]
    async fn marking_read_lowers_the_unread_count() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let user_id = insert_officer(&pool, "employee").await;
        let first = notify(&pool, user_id, NotificationType::CoverageOffered, json!({}))
            .await
            .unwrap();
        notify(&pool, user_id, NotificationType::CoverageOffered, json!({}))
            .await
            .unwrap();

        let cfg = Config::for_tests(std::env::temp_dir());
        let app = test::init_service(
            App::new()
                .app_data(Data::new(pool.clone()))
                .app_data(Data::new(cfg.clone()))
                .configure(|c| routes::configure(c, &cfg)),
        )
        .await;
        let bearer = format!("Bearer {}", sign(user_id, "employee", TokenType::Access, &cfg.jwt_secret));
        let peer = "127.0.0.1:40001".parse().unwrap();

        let unread = test::TestRequest::get()
            .uri("/api/notifications/unread-count")
            .insert_header(("Authorization", bearer.clone()))
            .peer_addr(peer)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, unread).await;
        assert_eq!(body["count"], 2);

        let read = test::TestRequest::put()
            .uri(&format!("/api/notifications/{first}/read"))
            .insert_header(("Authorization", bearer.clone()))
            .peer_addr(peer)
            .to_request();
        assert!(test::call_service(&app, read).await.status().is_success());

        let unread = test::TestRequest::get()
            .uri("/api/notifications/unread-count")
            .insert_header(("Authorization", bearer))
            .peer_addr(peer)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, unread).await;
        assert_eq!(body["count"], 1);
    }
}
