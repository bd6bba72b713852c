use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
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
use crate::model::notification::NotificationType;
use crate::model::status::Status;
use crate::model::training_request::{TRAINING_COLUMNS, TrainingRequest, TrainingWithUsers};
use crate::model::user::find_summary;
use crate::services::notify::notify;
use crate::utils::attachments;
use crate::workflow::{self, Decision, RequestKind, ResponseNotes};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTraining {
    #[validate(length(min = 1, max = 255, message = "The title field is required and may not exceed 255 characters."))]
    #[schema(example = "Crisis Intervention Team course")]
    pub title: String,
    #[validate(length(max = 255))]
    pub provider: Option<String>,
    #[validate(length(max = 255))]
    pub location: Option<String>,
    #[schema(example = "2026-04-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-04-05", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[validate(length(min = 1, message = "The justification field is required."))]
    pub justification: String,
    /// Path of an already stored file, relative to the attachment directory.
    #[schema(example = "training/brochure-2026.pdf")]
    pub attachment_path: Option<String>,
}

impl CreateTraining {
    pub fn validate_at(&self, today: NaiveDate, config: &Config) -> AppResult<()> {
        let mut rules = Rules::new();
        rules
            .not_in_past("start_date", self.start_date, today)
            .not_before("end_date", self.end_date, "start_date", self.start_date);
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

#[derive(Debug, Deserialize, IntoParams)]
pub struct TrainingFilter {
    /// Filter by officer (admin only)
    pub user_id: Option<u64>,
    #[param(example = "approved")]
    pub status: Option<Status>,
}

pub(crate) async fn fetch_training(
    executor: impl MySqlExecutor<'_>,
    training_id: u64,
    for_update: bool,
) -> AppResult<TrainingRequest> {
    let sql = format!(
        "SELECT {} FROM training_requests WHERE id = ?{}",
        TRAINING_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );
    sqlx::query_as::<_, TrainingRequest>(&sql)
        .bind(training_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found("Training request not found"))
}

async fn with_users(pool: &MySqlPool, training: TrainingRequest) -> AppResult<TrainingWithUsers> {
    let user = find_summary(pool, training.user_id).await?;
    let approver = match training.approved_by {
        Some(id) => find_summary(pool, id).await?,
        None => None,
    };
    Ok(TrainingWithUsers {
        training,
        user,
        approver,
    })
}

#[utoipa::path(
    post,
    path = "/api/training",
    request_body = CreateTraining,
    responses(
        (status = 201, description = "Training request submitted", body = TrainingWithUsers),
        (status = 422, description = "Validation failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Training"
)]
#[instrument(name = "training_create", skip(pool, config, payload), fields(user_id = auth.user_id))]
pub async fn create_training(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateTraining>,
) -> AppResult<HttpResponse> {
    payload.validate_at(today(), config.get_ref())?;

    let result = sqlx::query(
        r#"
        INSERT INTO training_requests
            (user_id, title, provider, location, start_date, end_date, justification, status, attachment_path)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(&payload.title)
    .bind(&payload.provider)
    .bind(&payload.location)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(&payload.justification)
    .bind(&payload.attachment_path)
    .execute(pool.get_ref())
    .await?;

    let training = fetch_training(pool.get_ref(), result.last_insert_id(), false).await?;
    info!(training_id = training.id, "Training request submitted");

    Ok(HttpResponse::Created().json(json!({
        "message": "Training request submitted successfully",
        "data": with_users(pool.get_ref(), training).await?,
    })))
}

#[utoipa::path(
    get,
    path = "/api/training",
    params(TrainingFilter),
    responses((status = 200, description = "Training requests", body = [TrainingRequest])),
    security(("bearer_auth" = [])),
    tag = "Training"
)]
pub async fn training_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TrainingFilter>,
) -> AppResult<HttpResponse> {
    let user_filter = if auth.is_admin() {
        query.user_id
    } else {
        Some(auth.user_id)
    };

    let mut sql = format!("SELECT {} FROM training_requests WHERE 1=1", TRAINING_COLUMNS);
    if user_filter.is_some() {
        sql.push_str(" AND user_id = ?");
    }
    if query.status.is_some() {
        sql.push_str(" AND status = ?");
    }
    sql.push_str(" ORDER BY start_date DESC, id DESC");

    let mut q = sqlx::query_as::<_, TrainingRequest>(&sql);
    if let Some(user_id) = user_filter {
        q = q.bind(user_id);
    }
    if let Some(status) = query.status {
        q = q.bind(status.to_string());
    }

    let requests = q.fetch_all(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "data": requests })))
}

#[utoipa::path(
    get,
    path = "/api/training/{training_id}",
    params(("training_id" = u64, Path, description = "Training request id")),
    responses(
        (status = 200, description = "Training request found", body = TrainingWithUsers),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Training request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Training"
)]
pub async fn get_training(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let training = fetch_training(pool.get_ref(), path.into_inner(), false).await?;
    workflow::authorize_view(auth.user_id, auth.role, &[training.user_id])?;
    Ok(HttpResponse::Ok().json(with_users(pool.get_ref(), training).await?))
}

async fn respond(
    auth: AuthUser,
    pool: &MySqlPool,
    training_id: u64,
    decision: Decision,
    notes: Option<String>,
) -> AppResult<HttpResponse> {
    let kind = RequestKind::Training;
    workflow::authorize_reviewer_role(kind, auth.role)?;
    let mut tx = pool.begin().await?;

    let training = fetch_training(&mut *tx, training_id, true).await?;
    workflow::authorize_response(kind, auth.user_id, auth.role, training.user_id)?;
    let status = workflow::transition(kind, training.status, decision.target(kind))?;

    let updated = sqlx::query(
        r#"
        UPDATE training_requests
        SET status = ?, admin_notes = ?, approved_by = ?, responded_at = NOW()
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(status.as_ref())
    .bind(&notes)
    .bind(auth.user_id)
    .bind(training_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::conflict("Training request has already been processed"));
    }

    notify(
        &mut *tx,
        training.user_id,
        NotificationType::TrainingRequestResponded,
        json!({
            "training_request_id": training_id,
            "title": training.title,
            "status": status,
            "notes": notes,
        }),
    )
    .await?;

    tx.commit().await?;
    info!(training_id, status = %status, "Training request answered");

    let training = fetch_training(pool, training_id, false).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": workflow::response_message(kind, status),
        "data": training,
    })))
}

#[utoipa::path(
    put,
    path = "/api/training/{training_id}/approve",
    params(("training_id" = u64, Path, description = "Training request id")),
    request_body(content = ResponseNotes, description = "Optional notes for the officer"),
    responses(
        (status = 200, description = "Training approved"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Training"
)]
#[instrument(name = "training_approve", skip(pool, body), fields(admin_id = auth.user_id))]
pub async fn approve_training(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<ResponseNotes>>,
) -> AppResult<HttpResponse> {
    let notes = body.map(|b| b.into_inner()).unwrap_or_default();
    Rules::new().check(&notes)?;
    respond(auth, pool.get_ref(), path.into_inner(), Decision::Approve, notes.admin_notes).await
}

#[utoipa::path(
    put,
    path = "/api/training/{training_id}/decline",
    params(("training_id" = u64, Path, description = "Training request id")),
    request_body(content = ResponseNotes, description = "Optional notes for the officer"),
    responses(
        (status = 200, description = "Training declined"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Training"
)]
#[instrument(name = "training_decline", skip(pool, body), fields(admin_id = auth.user_id))]
pub async fn decline_training(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<ResponseNotes>>,
) -> AppResult<HttpResponse> {
    let notes = body.map(|b| b.into_inner()).unwrap_or_default();
    Rules::new().check(&notes)?;
    respond(auth, pool.get_ref(), path.into_inner(), Decision::Decline, notes.admin_notes).await
}

/// Mark an approved training as attended. Owner or admin.
#[utoipa::path(
    put,
    path = "/api/training/{training_id}/complete",
    params(("training_id" = u64, Path, description = "Training request id")),
    responses(
        (status = 200, description = "Training completed"),
        (status = 400, description = "Training is not approved yet"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Training"
)]
#[instrument(name = "training_complete", skip(pool), fields(user_id = auth.user_id))]
pub async fn complete_training(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let training_id = path.into_inner();
    let training = fetch_training(pool.get_ref(), training_id, false).await?;
    auth.require_self_or_admin(training.user_id)?;
    workflow::transition(RequestKind::Training, training.status, Status::Completed)?;

    let updated = sqlx::query(
        r#"
        UPDATE training_requests
        SET status = 'completed', completed_at = NOW()
        WHERE id = ?
        AND status = 'approved'
        "#,
    )
    .bind(training_id)
    .execute(pool.get_ref())
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::conflict("Training request has already been completed"));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Training request marked as completed",
        "data": fetch_training(pool.get_ref(), training_id, false).await?,
    })))
}

/// Delete a training request and its stored attachment.
#[utoipa::path(
    delete,
    path = "/api/training/{training_id}",
    params(("training_id" = u64, Path, description = "Training request id")),
    responses(
        (status = 200, description = "Training request deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Training request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Training"
)]
#[instrument(name = "training_delete", skip(pool, config), fields(user_id = auth.user_id))]
pub async fn delete_training(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let training_id = path.into_inner();
    let training = fetch_training(pool.get_ref(), training_id, false).await?;
    workflow::authorize_delete(
        RequestKind::Training,
        auth.user_id,
        auth.role,
        training.user_id,
        training.status,
    )?;

    sqlx::query("DELETE FROM training_requests WHERE id = ?")
        .bind(training_id)
        .execute(pool.get_ref())
        .await?;

    attachments::discard_attachment(&config.attachment_dir, training.attachment_path.as_deref())
        .await;

    Ok(HttpResponse::Ok().json(json!({ "message": "Training request deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn payload(start: NaiveDate) -> CreateTraining {
        CreateTraining {
            title: "Firearms requalification".to_string(),
            provider: None,
            location: Some("Range 2".to_string()),
            start_date: start,
            end_date: start + Duration::days(1),
            justification: "Annual requirement".to_string(),
            attachment_path: Some("training/range.pdf".to_string()),
        }
    }

    #[test]
    fn accepts_upcoming_training() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let config = Config::for_tests(std::env::temp_dir());
        assert!(payload(today).validate_at(today, &config).is_ok());
    }

    #[test]
    fn rejects_past_dates_missing_fields_and_escaping_attachment() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let config = Config::for_tests(std::env::temp_dir());
        let mut p = payload(today - Duration::days(2));
        p.title = String::new();
        p.justification = String::new();
        p.attachment_path = Some("../../secrets".to_string());

        let Err(AppError::Validation(fields)) = p.validate_at(today, &config) else {
            panic!("expected validation failure");
        };
        for field in ["start_date", "title", "justification", "attachment_path"] {
            assert!(fields.contains_key(field), "missing {field}");
        }
    }
}
