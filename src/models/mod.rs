pub mod event;
pub mod report;
