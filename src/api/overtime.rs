use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::json;
use sqlx::{MySqlConnection, MySqlExecutor, MySqlPool};
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::api::rules::{Rules, today};
use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::notification::NotificationType;
use crate::model::overtime::{
    APPLICATION_COLUMNS, OVERTIME_COLUMNS, OvertimeApplication, OvertimeDetail, OvertimeRequest,
};
use crate::model::status::Status;
use crate::model::user::find_summary;
use crate::services::coverage::plan_coverage;
use crate::services::notify::notify;
use crate::workflow::{self, Decision, RequestKind, ResponseNotes};

fn check_shift(rules: &mut Rules, date: NaiveDate, start: NaiveTime, end: NaiveTime, today: NaiveDate) {
    rules.not_in_past("overtime_date", date, today);
    if end <= start {
        rules.fail("end_time", "The end time must be a time after start time.");
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOvertime {
    #[schema(example = "2026-03-14", format = "date", value_type = String)]
    pub overtime_date: NaiveDate,
    #[schema(example = "07:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "15:00:00", value_type = String)]
    pub end_time: NaiveTime,
    #[validate(length(min = 1, max = 64, message = "The overtime type field is required."))]
    #[schema(example = "special event")]
    pub overtime_type: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 50, message = "The employees required must be between 1 and 50."))]
    #[schema(example = 2)]
    pub employees_required: u32,
    /// Officer whose shift this slot covers, if any.
    pub covering_for: Option<u64>,
}

impl CreateOvertime {
    pub fn validate_at(&self, today: NaiveDate) -> AppResult<()> {
        let mut rules = Rules::new();
        check_shift(&mut rules, self.overtime_date, self.start_time, self.end_time, today);
        rules.check(self)
    }
}

/// Coverage fan-out for an officer on leave.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCoverage {
    #[schema(example = "2026-03-14", format = "date", value_type = String)]
    pub leave_date: NaiveDate,
    /// Officer on leave.
    pub covering_for: u64,
    #[validate(length(min = 1, message = "At least one candidate is required."))]
    #[schema(example = json!([12, 15]))]
    pub candidate_ids: Vec<u64>,
    #[schema(example = "07:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "15:00:00", value_type = String)]
    pub end_time: NaiveTime,
    #[serde(default = "default_coverage_type")]
    #[validate(length(min = 1, max = 64))]
    pub overtime_type: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

fn default_coverage_type() -> String {
    "coverage".to_string()
}

impl CreateCoverage {
    pub fn validate_at(&self, today: NaiveDate) -> AppResult<()> {
        let mut rules = Rules::new();
        rules.not_in_past("leave_date", self.leave_date, today);
        if self.end_time <= self.start_time {
            rules.fail("end_time", "The end time must be a time after start time.");
        }
        rules.check(self)
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct OvertimeFilter {
    /// Only requests still accepting applications
    pub open_only: Option<bool>,
    #[param(value_type = Option<String>, format = Date)]
    pub date: Option<NaiveDate>,
    pub covering_for: Option<u64>,
}

pub(crate) async fn fetch_overtime(
    executor: impl MySqlExecutor<'_>,
    overtime_id: u64,
    for_update: bool,
) -> AppResult<OvertimeRequest> {
    let sql = format!(
        "SELECT {} FROM overtime_requests WHERE id = ?{}",
        OVERTIME_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );
    sqlx::query_as::<_, OvertimeRequest>(&sql)
        .bind(overtime_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found("Overtime request not found"))
}

async fn fetch_application(
    executor: impl MySqlExecutor<'_>,
    application_id: u64,
    for_update: bool,
) -> AppResult<OvertimeApplication> {
    let sql = format!(
        "SELECT {} FROM overtime_applications WHERE id = ?{}",
        APPLICATION_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );
    sqlx::query_as::<_, OvertimeApplication>(&sql)
        .bind(application_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found("Overtime application not found"))
}

/// Whether `user_id` may apply to `request`.
fn check_can_apply(request: &OvertimeRequest, user_id: u64) -> AppResult<()> {
    if request.is_closed {
        return Err(AppError::conflict("This overtime request is closed"));
    }
    if request.covering_for == Some(user_id) {
        return Err(AppError::forbidden("You cannot cover your own shift"));
    }
    if request.offered_to.is_some_and(|candidate| candidate != user_id) {
        return Err(AppError::forbidden("This coverage slot was offered to another officer"));
    }
    Ok(())
}

async fn ensure_officer(
    executor: impl MySqlExecutor<'_>,
    field: &str,
    user_id: u64,
) -> AppResult<()> {
    match find_summary(executor, user_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::field(
            field,
            format!("The selected {} is invalid.", field.replace('_', " ")),
        )),
    }
}

/// Recount applied/approved from the application rows and close the request
/// once it is fully staffed. Must run in the caller's transaction.
async fn sync_counters(conn: &mut MySqlConnection, overtime_id: u64) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE overtime_requests o
        SET employees_applied = (
                SELECT COUNT(*) FROM overtime_applications a
                WHERE a.overtime_request_id = o.id
            ),
            employees_approved = (
                SELECT COUNT(*) FROM overtime_applications a
                WHERE a.overtime_request_id = o.id AND a.status = 'approved'
            )
        WHERE o.id = ?
        "#,
    )
    .bind(overtime_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "UPDATE overtime_requests SET is_closed = TRUE \
         WHERE id = ? AND employees_approved >= employees_required",
    )
    .bind(overtime_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn detail(pool: &MySqlPool, request: OvertimeRequest) -> AppResult<OvertimeDetail> {
    let applications = sqlx::query_as::<_, OvertimeApplication>(&format!(
        "SELECT {} FROM overtime_applications WHERE overtime_request_id = ? ORDER BY created_at",
        APPLICATION_COLUMNS
    ))
    .bind(request.id)
    .fetch_all(pool)
    .await?;

    let requester = find_summary(pool, request.requested_by).await?;
    let covered_employee = match request.covering_for {
        Some(id) => find_summary(pool, id).await?,
        None => None,
    };

    Ok(OvertimeDetail {
        request,
        requester,
        covered_employee,
        applications,
    })
}

#[utoipa::path(
    post,
    path = "/api/overtime",
    request_body = CreateOvertime,
    responses(
        (status = 201, description = "Overtime request created", body = OvertimeDetail),
        (status = 403, description = "Admin only"),
        (status = 422, description = "Validation failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Overtime"
)]
#[instrument(name = "overtime_create", skip(pool, payload), fields(admin_id = auth.user_id))]
pub async fn create_overtime(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateOvertime>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    payload.validate_at(today())?;
    if let Some(covering_for) = payload.covering_for {
        ensure_officer(pool.get_ref(), "covering_for", covering_for).await?;
    }

    let result = sqlx::query(
        r#"
        INSERT INTO overtime_requests
            (requested_by, covering_for, overtime_date, start_time, end_time, overtime_type,
             description, employees_required)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(payload.covering_for)
    .bind(payload.overtime_date)
    .bind(payload.start_time)
    .bind(payload.end_time)
    .bind(&payload.overtime_type)
    .bind(&payload.description)
    .bind(payload.employees_required)
    .execute(pool.get_ref())
    .await?;

    let request = fetch_overtime(pool.get_ref(), result.last_insert_id(), false).await?;
    info!(overtime_id = request.id, "Overtime request created");

    Ok(HttpResponse::Created().json(json!({
        "message": "Overtime request created successfully",
        "data": detail(pool.get_ref(), request).await?,
    })))
}

/// Create one coverage slot per candidate for an officer's leave day.
#[utoipa::path(
    post,
    path = "/api/overtime/coverage",
    request_body = CreateCoverage,
    responses(
        (status = 201, description = "Coverage slots created", body = [OvertimeRequest]),
        (status = 403, description = "Admin only"),
        (status = 422, description = "Validation failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Overtime"
)]
#[instrument(name = "overtime_coverage", skip(pool, payload), fields(admin_id = auth.user_id))]
pub async fn create_coverage(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateCoverage>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    payload.validate_at(today())?;

    let slots = plan_coverage(
        payload.covering_for,
        payload.leave_date,
        payload.start_time,
        payload.end_time,
        &payload.candidate_ids,
    );
    if slots.is_empty() {
        return Err(AppError::field(
            "candidate_ids",
            "The candidates may not only contain the officer on leave.",
        ));
    }

    ensure_officer(pool.get_ref(), "covering_for", payload.covering_for).await?;
    for slot in &slots {
        if find_summary(pool.get_ref(), slot.candidate_id).await?.is_none() {
            return Err(AppError::field(
                "candidate_ids",
                format!("The selected candidate {} is invalid.", slot.candidate_id),
            ));
        }
    }

    let mut tx = pool.begin().await?;
    let mut created = Vec::with_capacity(slots.len());
    for slot in &slots {
        let result = sqlx::query(
            r#"
            INSERT INTO overtime_requests
                (requested_by, covering_for, offered_to, overtime_date, start_time, end_time,
                 overtime_type, description, employees_required)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(auth.user_id)
        .bind(slot.covering_for)
        .bind(slot.candidate_id)
        .bind(slot.overtime_date)
        .bind(slot.start_time)
        .bind(slot.end_time)
        .bind(&payload.overtime_type)
        .bind(&payload.description)
        .execute(&mut *tx)
        .await?;
        let overtime_id = result.last_insert_id();

        notify(
            &mut *tx,
            slot.candidate_id,
            NotificationType::CoverageOffered,
            json!({
                "overtime_request_id": overtime_id,
                "covering_for": slot.covering_for,
                "overtime_date": slot.overtime_date,
                "start_time": slot.start_time,
                "end_time": slot.end_time,
            }),
        )
        .await?;

        created.push(fetch_overtime(&mut *tx, overtime_id, false).await?);
    }
    tx.commit().await?;

    info!(
        covering_for = payload.covering_for,
        slots = created.len(),
        "Coverage overtime created"
    );

    Ok(HttpResponse::Created().json(json!({
        "message": format!("{} coverage overtime request(s) created", created.len()),
        "data": created,
    })))
}

#[utoipa::path(
    get,
    path = "/api/overtime",
    params(OvertimeFilter),
    responses((status = 200, description = "Overtime requests", body = [OvertimeRequest])),
    security(("bearer_auth" = [])),
    tag = "Overtime"
)]
pub async fn overtime_list(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<OvertimeFilter>,
) -> AppResult<HttpResponse> {
    let mut sql = format!("SELECT {} FROM overtime_requests WHERE 1=1", OVERTIME_COLUMNS);
    if query.open_only.unwrap_or(false) {
        sql.push_str(" AND is_closed = FALSE");
    }
    if query.date.is_some() {
        sql.push_str(" AND overtime_date = ?");
    }
    if query.covering_for.is_some() {
        sql.push_str(" AND covering_for = ?");
    }
    sql.push_str(" ORDER BY overtime_date ASC, start_time ASC");

    let mut q = sqlx::query_as::<_, OvertimeRequest>(&sql);
    if let Some(date) = query.date {
        q = q.bind(date);
    }
    if let Some(covering_for) = query.covering_for {
        q = q.bind(covering_for);
    }

    let requests = q.fetch_all(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "data": requests })))
}

#[utoipa::path(
    get,
    path = "/api/overtime/{overtime_id}",
    params(("overtime_id" = u64, Path, description = "Overtime request id")),
    responses(
        (status = 200, description = "Overtime request with applications", body = OvertimeDetail),
        (status = 404, description = "Overtime request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Overtime"
)]
pub async fn get_overtime(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let request = fetch_overtime(pool.get_ref(), path.into_inner(), false).await?;
    Ok(HttpResponse::Ok().json(detail(pool.get_ref(), request).await?))
}

/// Apply for an open overtime slot.
#[utoipa::path(
    post,
    path = "/api/overtime/{overtime_id}/apply",
    params(("overtime_id" = u64, Path, description = "Overtime request id")),
    responses(
        (status = 201, description = "Application submitted", body = OvertimeApplication),
        (status = 409, description = "Closed or already applied")
    ),
    security(("bearer_auth" = [])),
    tag = "Overtime"
)]
#[instrument(name = "overtime_apply", skip(pool, auth), fields(user_id = auth.user_id, badge = %auth.badge_number))]
pub async fn apply_overtime(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let overtime_id = path.into_inner();
    let mut tx = pool.begin().await?;

    let request = fetch_overtime(&mut *tx, overtime_id, true).await?;
    check_can_apply(&request, auth.user_id)?;

    let already: Option<(u64,)> = sqlx::query_as(
        "SELECT id FROM overtime_applications WHERE overtime_request_id = ? AND employee_id = ?",
    )
    .bind(overtime_id)
    .bind(auth.user_id)
    .fetch_optional(&mut *tx)
    .await?;
    if already.is_some() {
        return Err(AppError::conflict("You have already applied for this overtime"));
    }

    let result = sqlx::query(
        "INSERT INTO overtime_applications (overtime_request_id, employee_id, status) \
         VALUES (?, ?, 'pending')",
    )
    .bind(overtime_id)
    .bind(auth.user_id)
    .execute(&mut *tx)
    .await?;

    sync_counters(&mut *tx, overtime_id).await?;
    let application = fetch_application(&mut *tx, result.last_insert_id(), false).await?;
    tx.commit().await?;

    info!(overtime_id, application_id = application.id, "Overtime application submitted");
    Ok(HttpResponse::Created().json(json!({
        "message": "Overtime application submitted successfully",
        "data": application,
    })))
}

async fn respond(
    auth: AuthUser,
    pool: &MySqlPool,
    application_id: u64,
    decision: Decision,
    notes: Option<String>,
) -> AppResult<HttpResponse> {
    let kind = RequestKind::OvertimeApplication;
    workflow::authorize_reviewer_role(kind, auth.role)?;

    // Lock order matches apply_overtime: the request row first, then its
    // applications.
    let unlocked = fetch_application(pool, application_id, false).await?;
    let mut tx = pool.begin().await?;
    let request = fetch_overtime(&mut *tx, unlocked.overtime_request_id, true).await?;
    let application = fetch_application(&mut *tx, application_id, true).await?;

    workflow::authorize_response(kind, auth.user_id, auth.role, application.employee_id)?;
    let status = workflow::transition(kind, application.status, decision.target(kind))?;
    if status == Status::Approved && request.employees_approved >= request.employees_required {
        return Err(AppError::conflict("Overtime request is already fully staffed"));
    }

    let updated = sqlx::query(
        r#"
        UPDATE overtime_applications
        SET status = ?, admin_notes = ?, responded_at = NOW()
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(status.as_ref())
    .bind(&notes)
    .bind(application_id)
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::conflict("Overtime application has already been processed"));
    }

    sync_counters(&mut *tx, request.id).await?;

    notify(
        &mut *tx,
        application.employee_id,
        NotificationType::OvertimeApplicationResponded,
        json!({
            "overtime_request_id": request.id,
            "overtime_application_id": application_id,
            "overtime_date": request.overtime_date,
            "status": status,
            "notes": notes,
        }),
    )
    .await?;

    let request = fetch_overtime(&mut *tx, request.id, false).await?;
    tx.commit().await?;

    if request.is_closed {
        info!(overtime_id = request.id, "Overtime request fully staffed and closed");
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": workflow::response_message(kind, status),
        "data": request,
    })))
}

#[utoipa::path(
    put,
    path = "/api/overtime/applications/{application_id}/approve",
    params(("application_id" = u64, Path, description = "Overtime application id")),
    request_body(content = ResponseNotes, description = "Optional notes for the officer"),
    responses(
        (status = 200, description = "Application approved"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Already processed or fully staffed")
    ),
    security(("bearer_auth" = [])),
    tag = "Overtime"
)]
#[instrument(name = "overtime_application_approve", skip(pool, body), fields(admin_id = auth.user_id))]
pub async fn approve_application(
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
    path = "/api/overtime/applications/{application_id}/decline",
    params(("application_id" = u64, Path, description = "Overtime application id")),
    request_body(content = ResponseNotes, description = "Optional notes for the officer"),
    responses(
        (status = 200, description = "Application declined"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Overtime"
)]
#[instrument(name = "overtime_application_decline", skip(pool, body), fields(admin_id = auth.user_id))]
pub async fn decline_application(
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
    put,
    path = "/api/overtime/{overtime_id}/close",
    params(("overtime_id" = u64, Path, description = "Overtime request id")),
    responses(
        (status = 200, description = "Overtime request closed"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Overtime"
)]
pub async fn close_overtime(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let overtime_id = path.into_inner();
    fetch_overtime(pool.get_ref(), overtime_id, false).await?;

    sqlx::query("UPDATE overtime_requests SET is_closed = TRUE WHERE id = ?")
        .bind(overtime_id)
        .execute(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Overtime request closed" })))
}

#[utoipa::path(
    delete,
    path = "/api/overtime/{overtime_id}",
    params(("overtime_id" = u64, Path, description = "Overtime request id")),
    responses(
        (status = 200, description = "Overtime request deleted"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Overtime request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Overtime"
)]
#[instrument(name = "overtime_delete", skip(pool), fields(admin_id = auth.user_id))]
pub async fn delete_overtime(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let overtime_id = path.into_inner();

    let result = sqlx::query("DELETE FROM overtime_requests WHERE id = ?")
        .bind(overtime_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        warn!(overtime_id, "Delete of unknown overtime request");
        return Err(AppError::not_found("Overtime request not found"));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Overtime request deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn overtime(date: NaiveDate, start: u32, end: u32, required: u32) -> CreateOvertime {
        CreateOvertime {
            overtime_date: date,
            start_time: time(start),
            end_time: time(end),
            overtime_type: "special event".to_string(),
            description: None,
            employees_required: required,
            covering_for: None,
        }
    }

    #[test]
    fn valid_overtime_passes() {
        assert!(overtime(today(), 7, 15, 2).validate_at(today()).is_ok());
    }

    #[test]
    fn past_date_inverted_times_and_zero_staff_fail() {
        let yesterday = today().pred_opt().unwrap();
        let Err(AppError::Validation(fields)) = overtime(yesterday, 15, 7, 0).validate_at(today())
        else {
            panic!("expected validation failure");
        };
        for field in ["overtime_date", "end_time", "employees_required"] {
            assert!(fields.contains_key(field), "missing {field}");
        }
    }

    #[test]
    fn coverage_defaults_type_and_needs_candidates() {
        let raw = r#"{
            "leave_date": "2026-11-02",
            "covering_for": 4,
            "candidate_ids": [],
            "start_time": "07:00:00",
            "end_time": "15:00:00"
        }"#;
        let coverage: CreateCoverage = serde_json::from_str(raw).unwrap();
        assert_eq!(coverage.overtime_type, "coverage");

        let Err(AppError::Validation(fields)) = coverage.validate_at(today()) else {
            panic!("expected validation failure");
        };
        assert!(fields.contains_key("candidate_ids"));
    }

    fn slot(covering_for: Option<u64>, offered_to: Option<u64>) -> OvertimeRequest {
        OvertimeRequest {
            id: 1,
            requested_by: 2,
            covering_for,
            offered_to,
            overtime_date: today(),
            start_time: time(7),
            end_time: time(15),
            overtime_type: "coverage".to_string(),
            description: None,
            employees_required: 1,
            employees_applied: 0,
            employees_approved: 0,
            is_closed: false,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn coverage_slot_is_reserved_for_its_candidate() {
        let offered = slot(Some(4), Some(9));
        assert!(check_can_apply(&offered, 9).is_ok());
        assert!(matches!(check_can_apply(&offered, 7), Err(AppError::Forbidden(_))));
        assert!(matches!(check_can_apply(&offered, 4), Err(AppError::Forbidden(_))));

        // Open slots without a candidate take anyone but the covered officer.
        let open = slot(Some(4), None);
        assert!(check_can_apply(&open, 7).is_ok());
        assert!(check_can_apply(&open, 4).is_err());
    }

    #[test]
    fn closed_requests_refuse_applications() {
        let mut closed = slot(None, None);
        closed.is_closed = true;
        assert!(matches!(check_can_apply(&closed, 7), Err(AppError::Conflict(_))));
    }

    #[test]
    fn coverage_in_the_past_fails() {
        let coverage = CreateCoverage {
            leave_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            covering_for: 4,
            candidate_ids: vec![5],
            start_time: time(7),
            end_time: time(15),
            overtime_type: "coverage".to_string(),
            description: None,
        };
        let Err(AppError::Validation(fields)) = coverage.validate_at(today()) else {
            panic!("expected validation failure");
        };
        assert!(fields.contains_key("leave_date"));
    }
}
