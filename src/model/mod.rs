pub mod court_request;
pub mod leave_request;
pub mod notification;
pub mod overtime;
pub mod role;
pub mod schedule;
pub mod status;
pub mod training_request;
pub mod user;
