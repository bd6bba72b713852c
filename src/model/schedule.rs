use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::leave_request::LeaveType;

/// Day status on the roster. `C`/`SD` mirror leave types, `S` is suspended
/// and `M` is military leave.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
pub enum ScheduleStatus {
    #[serde(rename = "working")]
    #[strum(serialize = "working")]
    Working,
    C,
    SD,
    S,
    M,
}

impl From<LeaveType> for ScheduleStatus {
    fn from(value: LeaveType) -> Self {
        match value {
            LeaveType::C => ScheduleStatus::C,
            LeaveType::SD => ScheduleStatus::SD,
        }
    }
}

impl TryFrom<String> for ScheduleStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Schedule {
    pub id: u64,
    pub user_id: u64,
    #[schema(example = "2026-02-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "07:00:00", value_type = Option<String>)]
    pub time_in: Option<NaiveTime>,
    #[sqlx(try_from = "String")]
    pub status: ScheduleStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_round_trip_through_storage_text() {
        assert_eq!(ScheduleStatus::Working.as_ref(), "working");
        assert_eq!("SD".parse::<ScheduleStatus>().unwrap(), ScheduleStatus::SD);
        assert_eq!(
            serde_json::to_string(&ScheduleStatus::Working).unwrap(),
            "\"working\""
        );
        assert_eq!(ScheduleStatus::from(LeaveType::C), ScheduleStatus::C);
    }
}
