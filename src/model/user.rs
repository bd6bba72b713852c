use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

/// Public view of an account. The password hash is never selected into it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 7,
        "first_name": "Maria",
        "last_name": "Santos",
        "badge_number": "PD-1042",
        "division": "Patrol",
        "role": "employee",
        "email": "m.santos@precinct.gov",
        "is_active": true,
        "created_at": "2026-01-01T00:00:00Z"
    })
)]
pub struct User {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub badge_number: String,
    pub division: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub email: String,
    pub is_active: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

pub const USER_COLUMNS: &str =
    "id, first_name, last_name, badge_number, division, role, email, is_active, created_at";

/// Compact user reference embedded in request payloads.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct UserSummary {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub badge_number: String,
    pub division: Option<String>,
}

pub async fn find_summary(
    pool: impl sqlx::MySqlExecutor<'_>,
    user_id: u64,
) -> Result<Option<UserSummary>, sqlx::Error> {
    sqlx::query_as::<_, UserSummary>(
        "SELECT id, first_name, last_name, badge_number, division FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}
