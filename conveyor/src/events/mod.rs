//! Structured events emitted on every run and stage state transition.

mod sink;

pub use sink::{CollectingEventSink, EventSink, NoOpEventSink, TracingEventSink};

use crate::core::{RunStatus, StageStatus};
use serde::Serialize;
use uuid::Uuid;

/// One state transition in a run.
///
/// The executor emits exactly one event per transition; sinks must never
/// fail or block the run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// The run has been accepted and the graph is about to be driven.
    RunStarted {
        /// The run id.
        run_id: Uuid,
        /// The pipeline name.
        pipeline: String,
    },
    /// A stage attempt has been dispatched to its collaborator.
    StageDispatched {
        /// The stage id.
        stage: String,
        /// 1-based attempt number.
        attempt: u32,
    },
    /// A stage attempt failed and will be retried after a delay.
    StageRetrying {
        /// The stage id.
        stage: String,
        /// The attempt that just failed (1-based).
        attempt: u32,
        /// Delay before the next attempt, in milliseconds.
        delay_ms: u64,
        /// The attempt's error.
        error: String,
    },
    /// A stage reached a terminal state.
    StageFinished {
        /// The stage id.
        stage: String,
        /// The terminal status.
        status: StageStatus,
        /// Attempts consumed.
        attempts: u32,
    },
    /// A stage was skipped because an ancestor's gate blocked it.
    StageSkipped {
        /// The stage id.
        stage: String,
        /// The blocking ancestor.
        blocked_by: String,
    },
    /// A gate policy blocked a stage's dependents.
    GateBlocked {
        /// The stage whose outcome was blocked on.
        stage: String,
    },
    /// The run was cancelled before completing.
    RunCancelled {
        /// Why cancellation was requested.
        reason: String,
    },
    /// Notification delivery failed (non-fatal).
    NotifyFailed {
        /// The delivery error.
        error: String,
    },
    /// The run reached its terminal state.
    RunFinished {
        /// The run id.
        run_id: Uuid,
        /// The overall status.
        status: RunStatus,
        /// Total duration in milliseconds.
        duration_ms: u64,
    },
}

impl RunEvent {
    /// A short stable name for the event kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run.started",
            Self::StageDispatched { .. } => "stage.dispatched",
            Self::StageRetrying { .. } => "stage.retrying",
            Self::StageFinished { .. } => "stage.finished",
            Self::StageSkipped { .. } => "stage.skipped",
            Self::GateBlocked { .. } => "gate.blocked",
            Self::RunCancelled { .. } => "run.cancelled",
            Self::NotifyFailed { .. } => "notify.failed",
            Self::RunFinished { .. } => "run.finished",
        }
    }
}
