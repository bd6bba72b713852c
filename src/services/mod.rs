pub mod coverage;
pub mod notify;
pub mod roster;
