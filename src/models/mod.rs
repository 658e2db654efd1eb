pub mod dashboard;
pub mod ids;
pub mod patient;
pub mod protocol;
pub mod seed;
pub mod sent_protocol;
pub mod supplement;
