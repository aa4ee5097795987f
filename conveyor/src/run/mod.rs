//! Run-scoped state: identity, the single-writer run record, and reports.

mod identity;
mod state;

pub use identity::RunIdentity;
pub use state::{RunReport, RunState, RunSummary};
