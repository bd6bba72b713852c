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
use crate::error::{AppError, AppResult};
use crate::model::leave_request::{LEAVE_COLUMNS, LeaveRequest, LeaveType, LeaveWithUser};
use crate::model::notification::NotificationType;
use crate::model::schedule::ScheduleStatus;
use crate::model::status::Status;
use crate::model::user::find_summary;
use crate::services::notify::notify;
use crate::workflow::{self, Decision, RequestKind, ResponseNotes};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "C")]
    pub leave_type: LeaveType,
    #[validate(length(max = 1000, message = "The reason may not be greater than 1000 characters."))]
    pub reason: Option<String>,
}

impl CreateLeave {
    pub fn validate_at(&self, today: NaiveDate) -> AppResult<()> {
        Rules::new()
            .not_in_past("start_date", self.start_date, today)
            .not_before("end_date", self.end_date, "start_date", self.start_date)
            .check(self)
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LeaveFilter {
    /// Filter by officer (admin only)
    pub user_id: Option<u64>,
    #[param(example = "pending")]
    pub status: Option<Status>,
    /// Leaves ending on or after this date
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
}

pub(crate) async fn fetch_leave(
    executor: impl MySqlExecutor<'_>,
    leave_id: u64,
    for_update: bool,
) -> AppResult<LeaveRequest> {
    let sql = format!(
        "SELECT {} FROM leave_requests WHERE id = ?{}",
        LEAVE_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );
    sqlx::query_as::<_, LeaveRequest>(&sql)
        .bind(leave_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found("Leave request not found"))
}

async fn with_user(pool: &MySqlPool, leave: LeaveRequest) -> AppResult<LeaveWithUser> {
    let user = find_summary(pool, leave.user_id).await?;
    Ok(LeaveWithUser { leave, user })
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body = CreateLeave,
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveWithUser),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Validation failed", body = Object, example = json!({
            "message": "The given data was invalid",
            "errors": { "start_date": ["The start date must be a date after or equal to today."] }
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
#[instrument(name = "leave_create", skip(auth, pool, payload), fields(user_id = auth.user_id, badge = %auth.badge_number))]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> AppResult<HttpResponse> {
    payload.validate_at(today())?;

    let result = sqlx::query(
        r#"
        INSERT INTO leave_requests (user_id, start_date, end_date, leave_type, reason, status)
        VALUES (?, ?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(auth.user_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.leave_type.as_ref())
    .bind(&payload.reason)
    .execute(pool.get_ref())
    .await?;

    let leave = fetch_leave(pool.get_ref(), result.last_insert_id(), false).await?;
    info!(leave_id = leave.id, "Leave request submitted");

    Ok(HttpResponse::Created().json(json!({
        "message": "Leave request submitted successfully",
        "data": with_user(pool.get_ref(), leave).await?,
    })))
}

/// List leave requests. Employees only ever see their own.
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Leave requests", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> AppResult<HttpResponse> {
    let user_filter = if auth.is_admin() {
        query.user_id
    } else {
        Some(auth.user_id)
    };

    let mut sql = format!("SELECT {} FROM leave_requests WHERE 1=1", LEAVE_COLUMNS);
    if user_filter.is_some() {
        sql.push_str(" AND user_id = ?");
    }
    if query.status.is_some() {
        sql.push_str(" AND status = ?");
    }
    if query.from.is_some() {
        sql.push_str(" AND end_date >= ?");
    }
    sql.push_str(" ORDER BY start_date DESC, id DESC");

    let mut q = sqlx::query_as::<_, LeaveRequest>(&sql);
    if let Some(user_id) = user_filter {
        q = q.bind(user_id);
    }
    if let Some(status) = query.status {
        q = q.bind(status.to_string());
    }
    if let Some(from) = query.from {
        q = q.bind(from);
    }

    let leaves = q.fetch_all(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "data": leaves })))
}

#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveWithUser),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let leave = fetch_leave(pool.get_ref(), path.into_inner(), false).await?;
    workflow::authorize_view(auth.user_id, auth.role, &[leave.user_id])?;
    Ok(HttpResponse::Ok().json(with_user(pool.get_ref(), leave).await?))
}

/// Apply an admin decision. Approval also stamps the leave type onto the
/// officer's roster for every scheduled day inside the leave.
async fn respond(
    auth: AuthUser,
    pool: &MySqlPool,
    leave_id: u64,
    decision: Decision,
    notes: Option<String>,
) -> AppResult<HttpResponse> {
    let kind = RequestKind::Leave;
    workflow::authorize_reviewer_role(kind, auth.role)?;
    let mut tx = pool.begin().await?;

    let leave = fetch_leave(&mut *tx, leave_id, true).await?;
    workflow::authorize_response(kind, auth.user_id, auth.role, leave.user_id)?;
    let status = workflow::transition(kind, leave.status, decision.target(kind))?;

    let updated = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = ?, admin_notes = ?, responded_by = ?, responded_at = NOW()
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(status.as_ref())
    .bind(&notes)
    .bind(auth.user_id)
    .bind(leave_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::conflict("Leave request has already been processed"));
    }

    if status == Status::Approved {
        let roster = sqlx::query(
            "UPDATE schedules SET status = ? WHERE user_id = ? AND date BETWEEN ? AND ?",
        )
        .bind(ScheduleStatus::from(leave.leave_type).as_ref())
        .bind(leave.user_id)
        .bind(leave.start_date)
        .bind(leave.end_date)
        .execute(&mut *tx)
        .await?;
        info!(leave_id, days = roster.rows_affected(), "Roster marked for leave");
    }

    notify(
        &mut *tx,
        leave.user_id,
        NotificationType::LeaveRequestResponded,
        json!({
            "leave_request_id": leave_id,
            "status": status,
            "start_date": leave.start_date,
            "end_date": leave.end_date,
            "notes": notes,
        }),
    )
    .await?;

    tx.commit().await?;
    info!(leave_id, status = %status, "Leave request answered");

    let leave = fetch_leave(pool, leave_id, false).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": workflow::response_message(kind, status),
        "data": leave,
    })))
}

/* =========================
Approve leave (Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(("leave_id" = u64, Path, description = "ID of the leave request to approve")),
    request_body(content = ResponseNotes, description = "Optional notes for the officer"),
    responses(
        (status = 200, description = "Leave approved", body = Object, example = json!({
            "message": "Leave request approved successfully"
        })),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
#[instrument(name = "leave_approve", skip(pool, body), fields(admin_id = auth.user_id))]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<ResponseNotes>>,
) -> AppResult<HttpResponse> {
    let notes = body.map(|b| b.into_inner()).unwrap_or_default();
    Rules::new().check(&notes)?;
    respond(auth, pool.get_ref(), path.into_inner(), Decision::Approve, notes.admin_notes).await
}

/* =========================
Decline leave (Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/decline",
    params(("leave_id" = u64, Path, description = "ID of the leave request to decline")),
    request_body(content = ResponseNotes, description = "Optional notes for the officer"),
    responses(
        (status = 200, description = "Leave declined", body = Object, example = json!({
            "message": "Leave request declined successfully"
        })),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
#[instrument(name = "leave_decline", skip(pool, body), fields(admin_id = auth.user_id))]
pub async fn decline_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<ResponseNotes>>,
) -> AppResult<HttpResponse> {
    let notes = body.map(|b| b.into_inner()).unwrap_or_default();
    Rules::new().check(&notes)?;
    respond(auth, pool.get_ref(), path.into_inner(), Decision::Decline, notes.admin_notes).await
}

#[utoipa::path(
    delete,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Leave request deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
#[instrument(name = "leave_delete", skip(pool), fields(user_id = auth.user_id))]
pub async fn delete_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let leave_id = path.into_inner();
    let leave = fetch_leave(pool.get_ref(), leave_id, false).await?;
    workflow::authorize_delete(
        RequestKind::Leave,
        auth.user_id,
        auth.role,
        leave.user_id,
        leave.status,
    )?;

    sqlx::query("DELETE FROM leave_requests WHERE id = ?")
        .bind(leave_id)
        .execute(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Leave request deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn payload(start: NaiveDate, end: NaiveDate) -> CreateLeave {
        CreateLeave {
            start_date: start,
            end_date: end,
            leave_type: LeaveType::C,
            reason: None,
        }
    }

    #[test]
    fn future_leave_is_valid() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let p = payload(today + Duration::days(1), today + Duration::days(3));
        assert!(p.validate_at(today).is_ok());
    }

    #[test]
    fn past_start_date_fails() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let p = payload(today - Duration::days(1), today + Duration::days(1));
        let Err(AppError::Validation(fields)) = p.validate_at(today) else {
            panic!("expected validation failure");
        };
        assert!(fields.contains_key("start_date"));
    }

    #[test]
    fn end_before_start_fails() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let p = payload(today + Duration::days(3), today + Duration::days(1));
        let Err(AppError::Validation(fields)) = p.validate_at(today) else {
            panic!("expected validation failure");
        };
        assert!(fields.contains_key("end_date"));
    }

    #[test]
    fn unknown_leave_type_is_rejected_at_parse() {
        let raw = r#"{"start_date":"2026-11-01","end_date":"2026-11-02","leave_type":"X"}"#;
        assert!(serde_json::from_str::<CreateLeave>(raw).is_err());
        let raw = r#"{"start_date":"2026-11-01","end_date":"2026-11-02","leave_type":"SD"}"#;
        assert_eq!(
            serde_json::from_str::<CreateLeave>(raw).unwrap().leave_type,
            LeaveType::SD
        );
    }
}
