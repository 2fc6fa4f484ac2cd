pub mod schedule;
pub mod status;
