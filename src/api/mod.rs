pub mod accounts;
pub mod court;
pub mod leave_request;
pub mod notifications;
pub mod overtime;
pub mod rules;
pub mod schedule;
pub mod training;
