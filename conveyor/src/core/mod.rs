//! Core outcome types: stage and run statuses and the per-stage result record.

mod result;
mod status;

pub use result::StageResult;
pub use status::{RunStatus, StageStatus};
