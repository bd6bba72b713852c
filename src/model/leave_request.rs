use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::{status::Status, user::UserSummary};

/// `C` is compensatory leave, `SD` is sick day.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
pub enum LeaveType {
    C,
    SD,
}

impl TryFrom<String> for LeaveType {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    pub id: u64,
    pub user_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub leave_type: LeaveType,
    pub reason: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: Status,
    pub admin_notes: Option<String>,
    pub responded_by: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub responded_at: Option<NaiveDateTime>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

pub const LEAVE_COLUMNS: &str = "id, user_id, start_date, end_date, leave_type, reason, status, \
     admin_notes, responded_by, responded_at, created_at";

/// Leave request with its owner loaded.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaveWithUser {
    #[serde(flatten)]
    pub leave: LeaveRequest,
    pub user: Option<UserSummary>,
}
