//! The mutable record of one pipeline execution.

use super::RunIdentity;
use crate::core::{RunStatus, StageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The mutable record of one run's progress and outcomes.
///
/// A `RunState` is created at trigger time, populated incrementally as
/// stages reach terminal states, and consumed by [`finalize`] once the
/// notifier has been given the final snapshot. It is owned exclusively by
/// one executor invocation; all writes happen on the executor's event loop,
/// so there is one logical writer even when many stages run concurrently.
///
/// [`finalize`]: RunState::finalize
#[derive(Debug)]
pub struct RunState {
    pipeline: String,
    identity: RunIdentity,
    results: HashMap<String, StageResult>,
    order: Vec<String>,
    started_at: DateTime<Utc>,
}

impl RunState {
    /// Creates a fresh run state for the given pipeline and identity.
    #[must_use]
    pub fn new(pipeline: impl Into<String>, identity: RunIdentity) -> Self {
        Self {
            pipeline: pipeline.into(),
            identity,
            results: HashMap::new(),
            order: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Returns the run identity.
    #[must_use]
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Records a terminal result for a stage.
    ///
    /// At most one outcome is ever kept per stage identifier; a second
    /// record for the same stage is dropped and logged as an engine bug.
    pub fn record(&mut self, result: StageResult) {
        use std::collections::hash_map::Entry;
        match self.results.entry(result.stage.clone()) {
            Entry::Occupied(existing) => {
                tracing::error!(
                    stage = %result.stage,
                    kept = %existing.get().status,
                    dropped = %result.status,
                    "duplicate stage outcome dropped"
                );
            }
            Entry::Vacant(slot) => {
                self.order.push(result.stage.clone());
                slot.insert(result);
            }
        }
    }

    /// Returns true if the stage already has a recorded outcome.
    #[must_use]
    pub fn is_recorded(&self, stage: &str) -> bool {
        self.results.contains_key(stage)
    }

    /// Returns the recorded result for a stage, if any.
    #[must_use]
    pub fn result(&self, stage: &str) -> Option<&StageResult> {
        self.results.get(stage)
    }

    /// Returns the number of recorded outcomes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true if no outcomes have been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Derives the overall run status: failed iff any stage failed or
    /// timed out.
    #[must_use]
    pub fn run_status(&self) -> RunStatus {
        if self.results.values().any(|r| r.status.is_failure()) {
            RunStatus::Failed
        } else {
            RunStatus::Succeeded
        }
    }

    /// Builds the summary handed to the notifier.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            pipeline: self.pipeline.clone(),
            run: self.identity.clone(),
            status: self.run_status(),
            stages: self.results_in_order(),
        }
    }

    /// Consumes the state into the final immutable report.
    #[must_use]
    pub fn finalize(self, notify_warning: Option<String>) -> RunReport {
        let status = self.run_status();
        let stages = self.results_in_order();
        RunReport {
            pipeline: self.pipeline,
            run: self.identity,
            status,
            stages,
            started_at: self.started_at,
            finished_at: Utc::now(),
            notify_warning,
        }
    }

    fn results_in_order(&self) -> Vec<StageResult> {
        self.order
            .iter()
            .filter_map(|id| self.results.get(id).cloned())
            .collect()
    }
}

/// The terminal snapshot handed to the notifier, exactly once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// The pipeline name.
    pub pipeline: String,
    /// Run identity.
    pub run: RunIdentity,
    /// Overall status.
    pub status: RunStatus,
    /// Every stage's terminal result, in recording order.
    pub stages: Vec<StageResult>,
}

impl RunSummary {
    /// Renders a short one-line-per-stage text summary.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!(
            "pipeline '{}' run {} {}",
            self.pipeline, self.run.run_id, self.status
        );
        for stage in &self.stages {
            out.push_str(&format!("\n  {}: {}", stage.stage, stage.status));
            if let Some(ref ancestor) = stage.blocked_by {
                out.push_str(&format!(" (blocked by '{ancestor}')"));
            }
            if let Some(ref detail) = stage.detail {
                out.push_str(&format!(" - {detail}"));
            }
        }
        out
    }
}

/// The final, archived record of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// The pipeline name.
    pub pipeline: String,
    /// Run identity.
    pub run: RunIdentity,
    /// Overall status.
    pub status: RunStatus,
    /// Every stage's terminal result, in recording order.
    pub stages: Vec<StageResult>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run reached its terminal state.
    pub finished_at: DateTime<Utc>,
    /// Set when notification delivery failed; informational only, never
    /// affects `status`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_warning: Option<String>,
}

impl RunReport {
    /// Returns true if the run passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Renders the user-facing final report: every stage's terminal status
    /// and, for skipped stages, the blocking ancestor.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!(
            "pipeline '{}' run {}: {}",
            self.pipeline, self.run.run_id, self.status
        );
        for stage in &self.stages {
            out.push_str(&format!("\n  {:<12} {}", stage.stage, stage.status));
            if let Some(ref ancestor) = stage.blocked_by {
                out.push_str(&format!(" (blocked by '{ancestor}')"));
            }
            if let Some(ref detail) = stage.detail {
                out.push_str(&format!(" - {detail}"));
            }
        }
        if let Some(ref warning) = self.notify_warning {
            out.push_str(&format!("\nwarning: notification not delivered: {warning}"));
        }
        out
    }
}
