use crate::api::accounts::{AccountListResponse, CreateAccount, DivisionCount};
use crate::api::court::{CourtReply, CreateCourt};
use crate::api::leave_request::CreateLeave;
use crate::api::overtime::{CreateCoverage, CreateOvertime};
use crate::api::schedule::{BulkUpdateFuture, CopyWeek, GenerateSchedule, UpdateSchedule};
use crate::api::training::CreateTraining;
use crate::model::court_request::{CourtRequest, CourtType, CourtWithUsers};
use crate::model::leave_request::{LeaveRequest, LeaveType, LeaveWithUser};
use crate::model::notification::{Notification, NotificationType};
use crate::model::overtime::{OvertimeApplication, OvertimeDetail, OvertimeRequest};
use crate::model::role::Role;
use crate::model::schedule::{Schedule, ScheduleStatus};
use crate::model::status::Status;
use crate::model::training_request::{TrainingRequest, TrainingWithUsers};
use crate::model::user::{User, UserSummary};
use crate::workflow::ResponseNotes;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Precinct Roster API",
        version = "1.0.0",
        description = r#"
## Police Department Personnel Portal

Back office for a police department's duty roster and personnel requests.

### Key Features
- **Leave**: officers request leave, admins approve or decline; approved leave is stamped onto the roster
- **Overtime**: admins post overtime slots, officers apply, approvals close full slots; coverage fan-out for officers on leave
- **Training**: officers request training, admins approve, decline and mark complete
- **Court**: admins assign court appearances, the summoned officer accepts or declines
- **Schedule**: month generation, future rewrites and week-pattern copies
- **Accounts** and **Notifications**

### Security
Every endpoint requires a **JWT Bearer** access token. Review and management
operations are restricted to the `admin` role.

### Response Format
JSON bodies. Errors carry a `message`; validation failures add per-field `errors`.
"#,
    ),
    paths(
        crate::api::leave_request::create_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::decline_leave,
        crate::api::leave_request::delete_leave,

        crate::api::overtime::create_overtime,
        crate::api::overtime::create_coverage,
        crate::api::overtime::overtime_list,
        crate::api::overtime::get_overtime,
        crate::api::overtime::apply_overtime,
        crate::api::overtime::approve_application,
        crate::api::overtime::decline_application,
        crate::api::overtime::close_overtime,
        crate::api::overtime::delete_overtime,

        crate::api::training::create_training,
        crate::api::training::training_list,
        crate::api::training::get_training,
        crate::api::training::approve_training,
        crate::api::training::decline_training,
        crate::api::training::complete_training,
        crate::api::training::delete_training,

        crate::api::court::create_court,
        crate::api::court::court_list,
        crate::api::court::get_court,
        crate::api::court::accept_court,
        crate::api::court::decline_court,
        crate::api::court::delete_court,

        crate::api::schedule::generate_schedule,
        crate::api::schedule::schedule_list,
        crate::api::schedule::update_schedule,
        crate::api::schedule::bulk_update_future,
        crate::api::schedule::copy_week,

        crate::api::accounts::create_account,
        crate::api::accounts::list_accounts,
        crate::api::accounts::my_account,
        crate::api::accounts::get_account,
        crate::api::accounts::update_account,
        crate::api::accounts::delete_account,
        crate::api::accounts::division_stats,

        crate::api::notifications::notification_list,
        crate::api::notifications::unread_count,
        crate::api::notifications::mark_read,
        crate::api::notifications::mark_all_read,
        crate::api::notifications::delete_notification
    ),
    components(
        schemas(
            Status,
            Role,
            ResponseNotes,
            User,
            UserSummary,
            CreateAccount,
            AccountListResponse,
            DivisionCount,
            LeaveType,
            LeaveRequest,
            LeaveWithUser,
            CreateLeave,
            OvertimeRequest,
            OvertimeApplication,
            OvertimeDetail,
            CreateOvertime,
            CreateCoverage,
            TrainingRequest,
            TrainingWithUsers,
            CreateTraining,
            CourtType,
            CourtRequest,
            CourtWithUsers,
            CreateCourt,
            CourtReply,
            ScheduleStatus,
            Schedule,
            GenerateSchedule,
            UpdateSchedule,
            BulkUpdateFuture,
            CopyWeek,
            NotificationType,
            Notification
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave request APIs"),
        (name = "Overtime", description = "Overtime and coverage APIs"),
        (name = "Training", description = "Training request APIs"),
        (name = "Court", description = "Court appearance APIs"),
        (name = "Schedule", description = "Duty roster APIs"),
        (name = "Accounts", description = "Officer account APIs"),
        (name = "Notifications", description = "In-app notification APIs"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by every path.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_area_with_bearer_auth() {
        let doc = ApiDoc::openapi();

        for path in [
            "/api/leave/{leave_id}/approve",
            "/api/overtime/coverage",
            "/api/training/{training_id}/complete",
            "/api/schedules/copy-week",
            "/api/accounts/divisions",
            "/api/notifications/unread-count",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
