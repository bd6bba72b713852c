use std::collections::HashMap;

use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::Deserialize;
use serde_json::json;
use sqlx::{MySqlConnection, MySqlPool};
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::api::rules::{Rules, today};
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::schedule::{Schedule, ScheduleStatus};
use crate::model::user::find_summary;
use crate::services::roster::{
    days_after, future_start, month_days, week_pattern_targets, weekday_selected,
};

/// Longest span a single copy-week call may fill.
const MAX_COPY_DAYS: u64 = 371;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GenerateSchedule {
    pub user_id: u64,
    #[validate(range(min = 2000, max = 2100, message = "The year must be between 2000 and 2100."))]
    #[schema(example = 2026)]
    pub year: i32,
    #[validate(range(min = 1, max = 12, message = "The month must be between 1 and 12."))]
    #[schema(example = 2)]
    pub month: u32,
    /// Defaults to `working`.
    pub status: Option<ScheduleStatus>,
    #[schema(example = "07:00:00", value_type = Option<String>)]
    pub time_in: Option<NaiveTime>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ScheduleQuery {
    /// Defaults to the caller
    pub user_id: Option<u64>,
    #[param(example = 2026)]
    pub year: i32,
    #[param(example = 2)]
    pub month: u32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSchedule {
    pub status: Option<ScheduleStatus>,
    #[schema(example = "08:00:00", value_type = Option<String>)]
    pub time_in: Option<NaiveTime>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkUpdateFuture {
    pub user_id: u64,
    #[schema(example = "2026-03-01", format = "date", value_type = String)]
    pub from_date: NaiveDate,
    pub status: ScheduleStatus,
    #[schema(example = "07:00:00", value_type = Option<String>)]
    pub time_in: Option<NaiveTime>,
    /// Restrict the rewrite to these weekdays.
    #[schema(value_type = Option<Vec<String>>, example = json!(["Mon", "Wed", "Fri"]))]
    pub weekdays: Option<Vec<Weekday>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CopyWeek {
    pub user_id: u64,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub source_week_start: NaiveDate,
    #[schema(example = "2026-03-29", format = "date", value_type = String)]
    pub until: NaiveDate,
}

impl CopyWeek {
    pub fn validate_range(&self) -> AppResult<()> {
        let mut rules = Rules::new();
        match self.source_week_start.checked_add_days(chrono::Days::new(MAX_COPY_DAYS)) {
            Some(limit) if self.until > limit => {
                rules.fail("until", "The until date may not be more than a year after the source week.");
            }
            Some(_) => {}
            None => {
                rules.fail("source_week_start", "The source week start is out of range.");
            }
        }
        rules.check(self)
    }
}

/// Working days always carry a start time. Other statuses keep whatever was
/// given, usually nothing.
fn time_for(
    status: ScheduleStatus,
    time_in: Option<NaiveTime>,
    default_time_in: NaiveTime,
) -> Option<NaiveTime> {
    match status {
        ScheduleStatus::Working => Some(time_in.unwrap_or(default_time_in)),
        _ => time_in,
    }
}

async fn ensure_user(pool: &MySqlPool, user_id: u64) -> AppResult<()> {
    match find_summary(pool, user_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::field("user_id", "The selected user id is invalid.")),
    }
}

async fn upsert_day(
    conn: &mut MySqlConnection,
    user_id: u64,
    date: NaiveDate,
    status: ScheduleStatus,
    time_in: Option<NaiveTime>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO schedules (user_id, date, time_in, status)
        VALUES (?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE time_in = VALUES(time_in), status = VALUES(status)
        "#,
    )
    .bind(user_id)
    .bind(date)
    .bind(time_in)
    .bind(status.as_ref())
    .execute(conn)
    .await?;
    Ok(())
}

async fn fetch_range(
    pool: &MySqlPool,
    user_id: u64,
    first: NaiveDate,
    last: NaiveDate,
) -> Result<Vec<Schedule>, sqlx::Error> {
    sqlx::query_as::<_, Schedule>(
        r#"
        SELECT id, user_id, date, time_in, status
        FROM schedules
        WHERE user_id = ? AND date BETWEEN ? AND ?
        ORDER BY date ASC
        "#,
    )
    .bind(user_id)
    .bind(first)
    .bind(last)
    .fetch_all(pool)
    .await
}

/* =========================
Generate a month
========================= */
#[utoipa::path(
    post,
    path = "/api/schedules/generate",
    request_body = GenerateSchedule,
    responses(
        (status = 200, description = "Month generated", body = [Schedule]),
        (status = 403, description = "Admin only"),
        (status = 422, description = "Validation failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
#[instrument(name = "schedule_generate", skip(pool, config, payload), fields(admin_id = auth.user_id, user_id = payload.user_id))]
pub async fn generate_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<GenerateSchedule>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    Rules::new().check(&*payload)?;
    ensure_user(pool.get_ref(), payload.user_id).await?;

    let days = month_days(payload.year, payload.month)?;
    let status = payload.status.unwrap_or(ScheduleStatus::Working);
    let time_in = time_for(status, payload.time_in, config.default_time_in);

    let mut tx = pool.begin().await?;
    for day in &days {
        upsert_day(&mut *tx, payload.user_id, *day, status, time_in).await?;
    }
    tx.commit().await?;

    info!(days = days.len(), year = payload.year, month = payload.month, "Schedule generated");

    let (first, last) = (days[0], days[days.len() - 1]);
    let rows = fetch_range(pool.get_ref(), payload.user_id, first, last).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Schedule generated for {} days", days.len()),
        "data": rows,
    })))
}

/* =========================
Month view
========================= */
#[utoipa::path(
    get,
    path = "/api/schedules",
    params(ScheduleQuery),
    responses(
        (status = 200, description = "Schedule rows for the month", body = [Schedule]),
        (status = 403, description = "Other officer's schedule")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn schedule_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ScheduleQuery>,
) -> AppResult<HttpResponse> {
    let user_id = query.user_id.unwrap_or(auth.user_id);
    auth.require_self_or_admin(user_id)?;

    let days = month_days(query.year, query.month)?;
    let (first, last) = (days[0], days[days.len() - 1]);
    debug!(user_id, %first, %last, "Fetching schedule");

    let rows = fetch_range(pool.get_ref(), user_id, first, last).await?;
    Ok(HttpResponse::Ok().json(json!({ "data": rows })))
}

/* =========================
Single day update
========================= */
#[utoipa::path(
    put,
    path = "/api/schedules/{schedule_id}",
    params(("schedule_id" = u64, Path, description = "Schedule row id")),
    request_body = UpdateSchedule,
    responses(
        (status = 200, description = "Schedule updated", body = Schedule),
        (status = 400, description = "Nothing to update"),
        (status = 404, description = "Schedule not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn update_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateSchedule>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    if payload.status.is_none() && payload.time_in.is_none() {
        return Err(AppError::bad_request("No fields provided for update"));
    }
    let schedule_id = path.into_inner();

    let result = sqlx::query(
        r#"
        UPDATE schedules
        SET status = COALESCE(?, status), time_in = COALESCE(?, time_in)
        WHERE id = ?
        "#,
    )
    .bind(payload.status.map(|s| s.to_string()))
    .bind(payload.time_in)
    .bind(schedule_id)
    .execute(pool.get_ref())
    .await?;

    let schedule = sqlx::query_as::<_, Schedule>(
        "SELECT id, user_id, date, time_in, status FROM schedules WHERE id = ?",
    )
    .bind(schedule_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::not_found("Schedule not found"))?;

    debug!(schedule_id, affected = result.rows_affected(), "Schedule day updated");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Schedule updated successfully",
        "data": schedule,
    })))
}

/* =========================
Rewrite future days
========================= */
#[utoipa::path(
    post,
    path = "/api/schedules/bulk-update-future",
    request_body = BulkUpdateFuture,
    responses(
        (status = 200, description = "Future rows rewritten"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
#[instrument(name = "schedule_bulk_update", skip(pool, config, payload), fields(admin_id = auth.user_id, user_id = payload.user_id))]
pub async fn bulk_update_future(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<BulkUpdateFuture>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    Rules::new().check(&*payload)?;

    let start = future_start(payload.from_date, today());
    let time_in = time_for(payload.status, payload.time_in, config.default_time_in);

    let mut tx = pool.begin().await?;
    let rows: Vec<(u64, NaiveDate)> = sqlx::query_as(
        "SELECT id, date FROM schedules WHERE user_id = ? AND date >= ? ORDER BY date FOR UPDATE",
    )
    .bind(payload.user_id)
    .bind(start)
    .fetch_all(&mut *tx)
    .await?;

    let mut updated = 0u64;
    for (id, date) in rows {
        if !weekday_selected(date, payload.weekdays.as_deref()) {
            continue;
        }
        updated += sqlx::query("UPDATE schedules SET status = ?, time_in = ? WHERE id = ?")
            .bind(payload.status.as_ref())
            .bind(time_in)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }
    tx.commit().await?;

    info!(%start, updated, "Future schedule rewritten");

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("{} schedule day(s) updated", updated),
        "updated": updated,
    })))
}

/* =========================
Repeat a week pattern
========================= */
#[utoipa::path(
    post,
    path = "/api/schedules/copy-week",
    request_body = CopyWeek,
    responses(
        (status = 200, description = "Week pattern copied"),
        (status = 403, description = "Admin only"),
        (status = 422, description = "Invalid range or empty source week")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
#[instrument(name = "schedule_copy_week", skip(pool, payload), fields(admin_id = auth.user_id, user_id = payload.user_id))]
pub async fn copy_week(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CopyWeek>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    payload.validate_range()?;

    let targets = week_pattern_targets(payload.source_week_start, payload.until, today())?;
    let source_rows = fetch_range(
        pool.get_ref(),
        payload.user_id,
        payload.source_week_start,
        days_after("source_week_start", payload.source_week_start, 6)?,
    )
    .await?;
    if source_rows.is_empty() {
        return Err(AppError::field(
            "source_week_start",
            "No schedule exists for the source week.",
        ));
    }
    let pattern: HashMap<NaiveDate, &Schedule> =
        source_rows.iter().map(|row| (row.date, row)).collect();

    let mut tx = pool.begin().await?;
    let mut copied = 0usize;
    for (target, source) in &targets {
        if let Some(row) = pattern.get(source) {
            upsert_day(&mut *tx, payload.user_id, *target, row.status, row.time_in).await?;
            copied += 1;
        }
    }
    tx.commit().await?;

    info!(copied, until = %payload.until, "Week pattern copied");

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Week pattern copied to {} day(s)", copied),
        "copied": copied,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seven() -> NaiveTime {
        NaiveTime::from_hms_opt(7, 0, 0).unwrap()
    }

    #[test]
    fn working_days_fall_back_to_the_default_time() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert_eq!(time_for(ScheduleStatus::Working, None, seven()), Some(seven()));
        assert_eq!(time_for(ScheduleStatus::Working, Some(nine), seven()), Some(nine));
        assert_eq!(time_for(ScheduleStatus::C, None, seven()), None);
    }

    #[test]
    fn generate_rejects_out_of_range_month() {
        let payload: GenerateSchedule =
            serde_json::from_str(r#"{"user_id": 3, "year": 2026, "month": 13}"#).unwrap();
        let Err(AppError::Validation(fields)) = Rules::new().check(&payload) else {
            panic!("expected validation failure");
        };
        assert!(fields.contains_key("month"));
    }

    #[test]
    fn bulk_update_accepts_weekday_names() {
        let payload: BulkUpdateFuture = serde_json::from_str(
            r#"{"user_id": 3, "from_date": "2026-11-01", "status": "S", "weekdays": ["Mon", "Fri"]}"#,
        )
        .unwrap();
        assert_eq!(payload.status, ScheduleStatus::S);
        assert_eq!(payload.weekdays, Some(vec![Weekday::Mon, Weekday::Fri]));
    }

    #[test]
    fn copy_week_span_is_capped() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let ok = CopyWeek {
            user_id: 3,
            source_week_start: start,
            until: start + chrono::Duration::days(28),
        };
        assert!(ok.validate_range().is_ok());

        let too_long = CopyWeek {
            user_id: 3,
            source_week_start: start,
            until: start + chrono::Duration::days(800),
        };
        assert!(matches!(too_long.validate_range(), Err(AppError::Validation(_))));
    }

    #[test]
    fn copy_week_near_the_calendar_end_is_a_field_error() {
        let payload: CopyWeek = serde_json::from_str(
            r#"{"user_id": 3, "source_week_start": "+262142-12-25", "until": "+262142-12-31"}"#,
        )
        .unwrap();
        let Err(AppError::Validation(fields)) = payload.validate_range() else {
            panic!("expected validation failure");
        };
        assert!(fields.contains_key("source_week_start"));
    }
}
