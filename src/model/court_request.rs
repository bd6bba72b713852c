use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::{status::Status, user::UserSummary};

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CourtType {
    Criminal,
    Traffic,
    Civil,
    Juvenile,
    Other,
}

impl TryFrom<String> for CourtType {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct CourtRequest {
    pub id: u64,
    /// Officer summoned to appear.
    pub employee_id: u64,
    pub created_by: u64,
    #[schema(example = "2026-05-20", format = "date", value_type = String)]
    pub court_date: NaiveDate,
    #[schema(example = "09:30:00", value_type = String)]
    pub court_time: NaiveTime,
    #[sqlx(try_from = "String")]
    pub court_type: CourtType,
    pub court_location: Option<String>,
    pub case_number: Option<String>,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: Status,
    pub employee_notes: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub responded_at: Option<NaiveDateTime>,
    pub attachment_path: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

pub const COURT_COLUMNS: &str = "id, employee_id, created_by, court_date, court_time, court_type, \
     court_location, case_number, description, status, employee_notes, responded_at, \
     attachment_path, created_at";

#[derive(Debug, Serialize, ToSchema)]
pub struct CourtWithUsers {
    #[serde(flatten)]
    pub court: CourtRequest,
    pub employee: Option<UserSummary>,
    pub creator: Option<UserSummary>,
}
