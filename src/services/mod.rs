pub mod poll;
pub mod query;
pub mod targets;
