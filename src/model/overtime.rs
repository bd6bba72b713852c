use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{status::Status, user::UserSummary};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct OvertimeRequest {
    pub id: u64,
    pub requested_by: u64,
    /// Employee whose shift this slot covers, if any.
    pub covering_for: Option<u64>,
    /// Coverage slots can only be taken by the officer they were offered to.
    pub offered_to: Option<u64>,
    #[schema(example = "2026-03-14", format = "date", value_type = String)]
    pub overtime_date: NaiveDate,
    #[schema(example = "07:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "15:00:00", value_type = String)]
    pub end_time: NaiveTime,
    #[schema(example = "coverage")]
    pub overtime_type: String,
    pub description: Option<String>,
    pub employees_required: u32,
    pub employees_applied: u32,
    pub employees_approved: u32,
    pub is_closed: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

pub const OVERTIME_COLUMNS: &str = "id, requested_by, covering_for, offered_to, overtime_date, start_time, \
     end_time, overtime_type, description, employees_required, employees_applied, \
     employees_approved, is_closed, created_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct OvertimeApplication {
    pub id: u64,
    pub overtime_request_id: u64,
    pub employee_id: u64,
    #[sqlx(try_from = "String")]
    pub status: Status,
    pub admin_notes: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub responded_at: Option<NaiveDateTime>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

pub const APPLICATION_COLUMNS: &str =
    "id, overtime_request_id, employee_id, status, admin_notes, responded_at, created_at";

#[derive(Debug, Serialize, ToSchema)]
pub struct OvertimeDetail {
    #[serde(flatten)]
    pub request: OvertimeRequest,
    pub requester: Option<UserSummary>,
    pub covered_employee: Option<UserSummary>,
    pub applications: Vec<OvertimeApplication>,
}
