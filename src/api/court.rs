use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::json;
use sqlx::{MySqlExecutor, MySqlPool};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::api::rules::{Rules, today};
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::court_request::{COURT_COLUMNS, CourtRequest, CourtType, CourtWithUsers};
use crate::model::notification::NotificationType;
use crate::model::status::Status;
use crate::model::user::find_summary;
use crate::services::notify::notify;
use crate::utils::attachments;
use crate::workflow::{self, Decision, RequestKind};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCourt {
    /// Officer summoned to appear.
    pub employee_id: u64,
    #[schema(example = "2026-05-20", format = "date", value_type = String)]
    pub court_date: NaiveDate,
    #[schema(example = "09:30:00", value_type = String)]
    pub court_time: NaiveTime,
    pub court_type: CourtType,
    #[validate(length(max = 255))]
    pub court_location: Option<String>,
    #[validate(length(max = 64))]
    #[schema(example = "CR-2026-00412")]
    pub case_number: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[schema(example = "court/subpoena-00412.pdf")]
    pub attachment_path: Option<String>,
}

impl CreateCourt {
    pub fn validate_at(&self, today: NaiveDate, config: &Config) -> AppResult<()> {
        let mut rules = Rules::new();
        rules.not_in_past("court_date", self.court_date, today);
        if let Some(path) = &self.attachment_path {
            if attachments::resolve(&config.attachment_dir, path).is_err() {
                rules.fail(
                    "attachment_path",
                    "The attachment path must be relative to the attachment directory",
                );
            }
        }
        rules.check(self)
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CourtReply {
    #[validate(length(max = 1000, message = "The employee notes may not be greater than 1000 characters."))]
    pub employee_notes: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CourtFilter {
    /// Filter by summoned officer (admin only)
    pub employee_id: Option<u64>,
    #[param(example = "pending")]
    pub status: Option<Status>,
    /// Only appearances on or after this date
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
}

pub(crate) async fn fetch_court(
    executor: impl MySqlExecutor<'_>,
    court_id: u64,
    for_update: bool,
) -> AppResult<CourtRequest> {
    let sql = format!(
        "SELECT {} FROM court_requests WHERE id = ?{}",
        COURT_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );
    sqlx::query_as::<_, CourtRequest>(&sql)
        .bind(court_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found("Court request not found"))
}

async fn with_users(pool: &MySqlPool, court: CourtRequest) -> AppResult<CourtWithUsers> {
    let employee = find_summary(pool, court.employee_id).await?;
    let creator = find_summary(pool, court.created_by).await?;
    Ok(CourtWithUsers {
        court,
        employee,
        creator,
    })
}

/// Issue a court appearance to an officer (Admin).
#[utoipa::path(
    post,
    path = "/api/court",
    request_body = CreateCourt,
    responses(
        (status = 201, description = "Court request created", body = CourtWithUsers),
        (status = 403, description = "Admin only"),
        (status = 422, description = "Validation failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Court"
)]
#[instrument(name = "court_create", skip(pool, config, payload), fields(admin_id = auth.user_id))]
pub async fn create_court(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateCourt>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    payload.validate_at(today(), config.get_ref())?;

    if find_summary(pool.get_ref(), payload.employee_id).await?.is_none() {
        return Err(AppError::field("employee_id", "The selected employee id is invalid."));
    }

    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        r#"
        INSERT INTO court_requests
            (employee_id, created_by, court_date, court_time, court_type, court_location,
             case_number, description, status, attachment_path)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(payload.employee_id)
    .bind(auth.user_id)
    .bind(payload.court_date)
    .bind(payload.court_time)
    .bind(payload.court_type.as_ref())
    .bind(&payload.court_location)
    .bind(&payload.case_number)
    .bind(&payload.description)
    .bind(&payload.attachment_path)
    .execute(&mut *tx)
    .await?;
    let court_id = result.last_insert_id();

    notify(
        &mut *tx,
        payload.employee_id,
        NotificationType::CourtRequestAssigned,
        json!({
            "court_request_id": court_id,
            "court_date": payload.court_date,
            "court_time": payload.court_time,
            "court_type": payload.court_type,
        }),
    )
    .await?;
    tx.commit().await?;
    info!(court_id, employee_id = payload.employee_id, "Court request issued");

    let court = fetch_court(pool.get_ref(), court_id, false).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Court request created successfully",
        "data": with_users(pool.get_ref(), court).await?,
    })))
}

#[utoipa::path(
    get,
    path = "/api/court",
    params(CourtFilter),
    responses((status = 200, description = "Court requests", body = [CourtRequest])),
    security(("bearer_auth" = [])),
    tag = "Court"
)]
pub async fn court_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<CourtFilter>,
) -> AppResult<HttpResponse> {
    let employee_filter = if auth.is_admin() {
        query.employee_id
    } else {
        Some(auth.user_id)
    };

    let mut sql = format!("SELECT {} FROM court_requests WHERE 1=1", COURT_COLUMNS);
    if employee_filter.is_some() {
        sql.push_str(" AND employee_id = ?");
    }
    if query.status.is_some() {
        sql.push_str(" AND status = ?");
    }
    if query.from.is_some() {
        sql.push_str(" AND court_date >= ?");
    }
    sql.push_str(" ORDER BY court_date ASC, court_time ASC");

    let mut q = sqlx::query_as::<_, CourtRequest>(&sql);
    if let Some(employee_id) = employee_filter {
        q = q.bind(employee_id);
    }
    if let Some(status) = query.status {
        q = q.bind(status.to_string());
    }
    if let Some(from) = query.from {
        q = q.bind(from);
    }

    let requests = q.fetch_all(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "data": requests })))
}

#[utoipa::path(
    get,
    path = "/api/court/{court_id}",
    params(("court_id" = u64, Path, description = "Court request id")),
    responses(
        (status = 200, description = "Court request found", body = CourtWithUsers),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Court request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Court"
)]
pub async fn get_court(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let court = fetch_court(pool.get_ref(), path.into_inner(), false).await?;
    workflow::authorize_view(auth.user_id, auth.role, &[court.employee_id, court.created_by])?;
    Ok(HttpResponse::Ok().json(with_users(pool.get_ref(), court).await?))
}

async fn respond(
    auth: AuthUser,
    pool: &MySqlPool,
    court_id: u64,
    decision: Decision,
    employee_notes: Option<String>,
) -> AppResult<HttpResponse> {
    let kind = RequestKind::Court;
    let mut tx = pool.begin().await?;

    let court = fetch_court(&mut *tx, court_id, true).await?;
    workflow::authorize_response(kind, auth.user_id, auth.role, court.employee_id)?;
    let status = workflow::transition(kind, court.status, decision.target(kind))?;

    let updated = sqlx::query(
        r#"
        UPDATE court_requests
        SET status = ?, employee_notes = ?, responded_at = NOW()
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(status.as_ref())
    .bind(&employee_notes)
    .bind(court_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::conflict("Court request has already been processed"));
    }

    notify(
        &mut *tx,
        court.created_by,
        NotificationType::CourtRequestResponded,
        json!({
            "court_request_id": court_id,
            "employee_id": court.employee_id,
            "status": status,
            "employee_notes": employee_notes,
        }),
    )
    .await?;

    tx.commit().await?;
    info!(court_id, status = %status, "Court request answered");

    let court = fetch_court(pool, court_id, false).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": workflow::response_message(kind, status),
        "data": court,
    })))
}

/// Accept a court appearance (assigned officer only).
#[utoipa::path(
    put,
    path = "/api/court/{court_id}/accept",
    params(("court_id" = u64, Path, description = "Court request id")),
    request_body(content = CourtReply, description = "Optional notes for the issuing admin"),
    responses(
        (status = 200, description = "Court request accepted", body = Object, example = json!({
            "message": "Court request accepted successfully"
        })),
        (status = 403, description = "Not the assigned officer"),
        (status = 409, description = "Already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Court"
)]
#[instrument(name = "court_accept", skip(pool, body), fields(user_id = auth.user_id))]
pub async fn accept_court(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<CourtReply>>,
) -> AppResult<HttpResponse> {
    let reply = body.map(|b| b.into_inner()).unwrap_or_default();
    Rules::new().check(&reply)?;
    respond(auth, pool.get_ref(), path.into_inner(), Decision::Approve, reply.employee_notes).await
}

/// Decline a court appearance (assigned officer only).
#[utoipa::path(
    put,
    path = "/api/court/{court_id}/decline",
    params(("court_id" = u64, Path, description = "Court request id")),
    request_body(content = CourtReply, description = "Optional notes for the issuing admin"),
    responses(
        (status = 200, description = "Court request declined"),
        (status = 403, description = "Not the assigned officer"),
        (status = 409, description = "Already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Court"
)]
#[instrument(name = "court_decline", skip(pool, body), fields(user_id = auth.user_id))]
pub async fn decline_court(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<CourtReply>>,
) -> AppResult<HttpResponse> {
    let reply = body.map(|b| b.into_inner()).unwrap_or_default();
    Rules::new().check(&reply)?;
    respond(auth, pool.get_ref(), path.into_inner(), Decision::Decline, reply.employee_notes).await
}

#[utoipa::path(
    delete,
    path = "/api/court/{court_id}",
    params(("court_id" = u64, Path, description = "Court request id")),
    responses(
        (status = 200, description = "Court request deleted"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Court request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Court"
)]
#[instrument(name = "court_delete", skip(pool, config), fields(user_id = auth.user_id))]
pub async fn delete_court(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let court_id = path.into_inner();
    let court = fetch_court(pool.get_ref(), court_id, false).await?;
    workflow::authorize_delete(
        RequestKind::Court,
        auth.user_id,
        auth.role,
        court.employee_id,
        court.status,
    )?;

    sqlx::query("DELETE FROM court_requests WHERE id = ?")
        .bind(court_id)
        .execute(pool.get_ref())
        .await?;

    attachments::discard_attachment(&config.attachment_dir, court.attachment_path.as_deref())
        .await;

    Ok(HttpResponse::Ok().json(json!({ "message": "Court request deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test};

    use crate::auth::jwt::testing::sign;
    use crate::db::testing::{insert_officer, test_pool};
    use crate::models::TokenType;
    use crate::routes;

    #[actix_web::test]
    async fn only_the_summoned_officer_may_answer() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let admin = insert_officer(&pool, "admin").await;
        let summoned = insert_officer(&pool, "employee").await;
        let bystander = insert_officer(&pool, "employee").await;

        let court_id = sqlx::query(
            "INSERT INTO court_requests (employee_id, created_by, court_date, court_time, court_type) \
             VALUES (?, ?, '2099-01-05', '09:30:00', ?)",
        )
        .bind(summoned)
        .bind(admin)
        .bind(CourtType::Traffic.as_ref())
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_id();

        let cfg = Config::for_tests(std::env::temp_dir());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool.clone()))
                .app_data(web::Data::new(cfg.clone()))
                .configure(|c| routes::configure(c, &cfg)),
        )
        .await;

        for actor in [bystander, admin] {
            let role = if actor == admin { "admin" } else { "employee" };
            let req = test::TestRequest::put()
                .uri(&format!("/api/court/{court_id}/decline"))
                .insert_header((
                    "Authorization",
                    format!("Bearer {}", sign(actor, role, TokenType::Access, &cfg.jwt_secret)),
                ))
                .peer_addr("127.0.0.1:40002".parse().unwrap())
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
        }

        let status: String = sqlx::query_scalar("SELECT status FROM court_requests WHERE id = ?")
            .bind(court_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(status, "pending");
    }

    #[::core::prelude::v1::test]
    fn court_date_in_the_past_fails() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let config = Config::for_tests(std::env::temp_dir());
        let payload = CreateCourt {
            employee_id: 9,
            court_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            court_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            court_type: CourtType::Traffic,
            court_location: None,
            case_number: None,
            description: None,
            attachment_path: None,
        };

        let Err(AppError::Validation(fields)) = payload.validate_at(today, &config) else {
            panic!("expected validation failure");
        };
        assert!(fields.contains_key("court_date"));
    }

    #[::core::prelude::v1::test]
    fn court_type_must_be_known() {
        let raw = r#"{"employee_id":9,"court_date":"2026-11-02","court_time":"09:30:00","court_type":"martial"}"#;
        assert!(serde_json::from_str::<CreateCourt>(raw).is_err());
        let raw = r#"{"employee_id":9,"court_date":"2026-11-02","court_time":"09:30:00","court_type":"juvenile"}"#;
        assert_eq!(
            serde_json::from_str::<CreateCourt>(raw).unwrap().court_type,
            CourtType::Juvenile
        );
    }
}
