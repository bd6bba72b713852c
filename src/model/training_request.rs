use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{status::Status, user::UserSummary};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct TrainingRequest {
    pub id: u64,
    pub user_id: u64,
    #[schema(example = "Crisis Intervention Team course")]
    pub title: String,
    pub provider: Option<String>,
    pub location: Option<String>,
    #[schema(example = "2026-04-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-04-05", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub justification: String,
    #[sqlx(try_from = "String")]
    pub status: Status,
    pub admin_notes: Option<String>,
    pub approved_by: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub responded_at: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub completed_at: Option<NaiveDateTime>,
    pub attachment_path: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

pub const TRAINING_COLUMNS: &str = "id, user_id, title, provider, location, start_date, end_date, \
     justification, status, admin_notes, approved_by, responded_at, completed_at, \
     attachment_path, created_at";

#[derive(Debug, Serialize, ToSchema)]
pub struct TrainingWithUsers {
    #[serde(flatten)]
    pub training: TrainingRequest,
    pub user: Option<UserSummary>,
    pub approver: Option<UserSummary>,
}
