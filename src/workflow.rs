//! Lifecycle rules shared by every request-like record.
//!
//! Leave, training and overtime applications are submitted by an employee and
//! reviewed by an admin. Court requests run the other way: an admin issues
//! them and the assigned employee accepts or declines. Every record starts
//! `pending` and only ever moves forward.

use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::model::{role::Role, status::Status};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RequestKind {
    Leave,
    Training,
    OvertimeApplication,
    Court,
}

/// Who is allowed to answer a pending record.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Reviewer {
    Admin,
    Assignee,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Decision {
    Approve,
    Decline,
}

impl RequestKind {
    pub fn label(&self) -> &'static str {
        match self {
            RequestKind::Leave => "Leave request",
            RequestKind::Training => "Training request",
            RequestKind::OvertimeApplication => "Overtime application",
            RequestKind::Court => "Court request",
        }
    }

    pub fn reviewer(&self) -> Reviewer {
        match self {
            RequestKind::Court => Reviewer::Assignee,
            _ => Reviewer::Admin,
        }
    }

    /// Positive terminal state: `accepted` for court, `approved` otherwise.
    pub fn positive_status(&self) -> Status {
        match self {
            RequestKind::Court => Status::Accepted,
            _ => Status::Approved,
        }
    }
}

impl Decision {
    pub fn target(self, kind: RequestKind) -> Status {
        match self {
            Decision::Approve => kind.positive_status(),
            Decision::Decline => Status::Declined,
        }
    }
}

/// Optional remark attached to a decision.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct ResponseNotes {
    #[serde(alias = "notes")]
    #[validate(length(max = 1000, message = "The admin notes may not be greater than 1000 characters."))]
    pub admin_notes: Option<String>,
}

fn is_legal(kind: RequestKind, from: Status, to: Status) -> bool {
    match (from, to) {
        (Status::Pending, Status::Declined) => true,
        (Status::Pending, Status::Approved) => kind != RequestKind::Court,
        (Status::Pending, Status::Accepted) => kind == RequestKind::Court,
        (Status::Approved, Status::Completed) => kind == RequestKind::Training,
        _ => false,
    }
}

/// Validate a status move. Returns the new status on success.
pub fn transition(kind: RequestKind, from: Status, to: Status) -> AppResult<Status> {
    if is_legal(kind, from, to) {
        return Ok(to);
    }
    if from.is_pending() {
        return Err(AppError::bad_request(format!(
            "{} cannot be marked {}",
            kind.label(),
            to
        )));
    }
    Err(AppError::conflict(format!(
        "{} has already been {}",
        kind.label(),
        from
    )))
}

/// Only the counterpart of the submitter may answer a record.
pub fn authorize_response(
    kind: RequestKind,
    actor_id: u64,
    actor_role: Role,
    assignee_id: u64,
) -> AppResult<()> {
    let allowed = match kind.reviewer() {
        Reviewer::Admin => actor_role.is_admin(),
        Reviewer::Assignee => actor_id == assignee_id,
    };
    if allowed {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "You are not allowed to respond to this {}",
            kind.label().to_lowercase()
        )))
    }
}

/// Role gate that needs no row. Admin-reviewed kinds refuse everyone else
/// before anything is read or locked.
pub fn authorize_reviewer_role(kind: RequestKind, actor_role: Role) -> AppResult<()> {
    match kind.reviewer() {
        Reviewer::Admin if !actor_role.is_admin() => Err(AppError::forbidden(format!(
            "You are not allowed to respond to this {}",
            kind.label().to_lowercase()
        ))),
        _ => Ok(()),
    }
}

/// Admins may delete anything. Owners may withdraw their own submissions
/// while they are still pending. Court requests are admin-managed only.
pub fn authorize_delete(
    kind: RequestKind,
    actor_id: u64,
    actor_role: Role,
    owner_id: u64,
    status: Status,
) -> AppResult<()> {
    if actor_role.is_admin() {
        return Ok(());
    }
    if kind == RequestKind::Court || actor_id != owner_id {
        return Err(AppError::forbidden(format!(
            "You are not allowed to delete this {}",
            kind.label().to_lowercase()
        )));
    }
    if !status.is_pending() {
        return Err(AppError::forbidden(format!(
            "{} can no longer be deleted once it has been {}",
            kind.label(),
            status
        )));
    }
    Ok(())
}

/// Admins see every record, employees only the ones they take part in.
pub fn authorize_view(actor_id: u64, actor_role: Role, participants: &[u64]) -> AppResult<()> {
    if actor_role.is_admin() || participants.contains(&actor_id) {
        Ok(())
    } else {
        Err(AppError::forbidden("You are not allowed to view this record"))
    }
}

pub fn response_message(kind: RequestKind, status: Status) -> String {
    format!("{} {} successfully", kind.label(), status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_moves_to_kind_specific_terminal_state() {
        assert_eq!(
            transition(RequestKind::Leave, Status::Pending, Status::Approved).unwrap(),
            Status::Approved
        );
        assert_eq!(
            transition(RequestKind::Court, Status::Pending, Status::Accepted).unwrap(),
            Status::Accepted
        );
        assert!(transition(RequestKind::Court, Status::Pending, Status::Approved).is_err());
        assert!(transition(RequestKind::Leave, Status::Pending, Status::Accepted).is_err());
    }

    #[test]
    fn terminal_states_are_final() {
        for kind in [
            RequestKind::Leave,
            RequestKind::Training,
            RequestKind::OvertimeApplication,
            RequestKind::Court,
        ] {
            let err = transition(kind, Status::Declined, kind.positive_status()).unwrap_err();
            assert!(matches!(err, AppError::Conflict(_)));
        }
        assert!(transition(RequestKind::Leave, Status::Approved, Status::Declined).is_err());
    }

    #[test]
    fn role_gate_only_applies_to_admin_reviewed_kinds() {
        assert!(authorize_reviewer_role(RequestKind::Leave, Role::Employee).is_err());
        assert!(authorize_reviewer_role(RequestKind::OvertimeApplication, Role::Employee).is_err());
        assert!(authorize_reviewer_role(RequestKind::Training, Role::Admin).is_ok());
        // Court is answered by its assignee, which needs the row.
        assert!(authorize_reviewer_role(RequestKind::Court, Role::Employee).is_ok());
    }

    #[test]
    fn only_approved_training_can_complete() {
        assert!(transition(RequestKind::Training, Status::Approved, Status::Completed).is_ok());
        assert!(transition(RequestKind::Training, Status::Pending, Status::Completed).is_err());
        assert!(transition(RequestKind::Leave, Status::Approved, Status::Completed).is_err());
    }

    #[test]
    fn decision_targets() {
        assert_eq!(Decision::Approve.target(RequestKind::Court), Status::Accepted);
        assert_eq!(Decision::Approve.target(RequestKind::Training), Status::Approved);
        assert_eq!(Decision::Decline.target(RequestKind::Leave), Status::Declined);
    }

    #[test]
    fn employee_submitted_requests_need_an_admin() {
        assert!(authorize_response(RequestKind::Leave, 1, Role::Admin, 9).is_ok());
        let err = authorize_response(RequestKind::Leave, 9, Role::Employee, 9).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn court_requests_need_the_assigned_employee() {
        assert!(authorize_response(RequestKind::Court, 9, Role::Employee, 9).is_ok());
        assert!(authorize_response(RequestKind::Court, 8, Role::Employee, 9).is_err());
        assert!(authorize_response(RequestKind::Court, 1, Role::Admin, 9).is_err());
    }

    #[test]
    fn owners_delete_only_pending_requests() {
        assert!(authorize_delete(RequestKind::Leave, 5, Role::Employee, 5, Status::Pending).is_ok());
        assert!(authorize_delete(RequestKind::Leave, 5, Role::Employee, 5, Status::Approved).is_err());
        assert!(authorize_delete(RequestKind::Training, 6, Role::Employee, 5, Status::Pending).is_err());
        assert!(authorize_delete(RequestKind::Court, 5, Role::Employee, 5, Status::Pending).is_err());
        assert!(authorize_delete(RequestKind::Court, 1, Role::Admin, 5, Status::Accepted).is_ok());
    }

    #[test]
    fn view_is_limited_to_participants() {
        assert!(authorize_view(3, Role::Employee, &[3, 4]).is_ok());
        assert!(authorize_view(5, Role::Employee, &[3, 4]).is_err());
        assert!(authorize_view(1, Role::Admin, &[3]).is_ok());
    }

    #[test]
    fn notes_accept_either_key() {
        let notes: ResponseNotes = serde_json::from_str(r#"{"notes":"ok"}"#).unwrap();
        assert_eq!(notes.admin_notes.as_deref(), Some("ok"));
        let notes: ResponseNotes = serde_json::from_str(r#"{"admin_notes":"fine"}"#).unwrap();
        assert_eq!(notes.admin_notes.as_deref(), Some("fine"));
    }

    #[test]
    fn messages_name_the_kind_and_outcome() {
        assert_eq!(
            response_message(RequestKind::Leave, Status::Approved),
            "Leave request approved successfully"
        );
        assert_eq!(
            response_message(RequestKind::Court, Status::Declined),
            "Court request declined successfully"
        );
    }
}
