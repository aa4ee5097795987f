//! The immutable per-stage result record.

use super::StageStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The terminal record for one stage in one run.
///
/// A result is constructed once, when the stage reaches a terminal state,
/// and never mutated after being recorded into the run state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// The stage identifier.
    pub stage: String,
    /// The terminal status.
    pub status: StageStatus,
    /// Free-form diagnostic payload: a report URL, an error message, a log
    /// reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// For skipped stages, the identifier of the gate-blocked ancestor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<String>,
    /// Number of attempts consumed (0 for stages that never ran).
    pub attempts: u32,
    /// When the first attempt started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the terminal state was reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl StageResult {
    fn new(stage: impl Into<String>, status: StageStatus) -> Self {
        Self {
            stage: stage.into(),
            status,
            detail: None,
            blocked_by: None,
            attempts: 0,
            started_at: None,
            finished_at: None,
        }
    }

    /// Creates a successful result.
    #[must_use]
    pub fn succeeded(stage: impl Into<String>) -> Self {
        Self::new(stage, StageStatus::Succeeded)
    }

    /// Creates a failed result with a diagnostic detail.
    #[must_use]
    pub fn failed(stage: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(stage, StageStatus::Failed).with_detail(detail)
    }

    /// Creates a skipped result attributed to the blocking ancestor.
    #[must_use]
    pub fn skipped(stage: impl Into<String>, blocked_by: impl Into<String>) -> Self {
        let mut result = Self::new(stage, StageStatus::Skipped);
        result.blocked_by = Some(blocked_by.into());
        result
    }

    /// Creates a skipped result for a stage that never got to run (e.g.
    /// the run deadline elapsed first), with no blocking ancestor.
    #[must_use]
    pub fn not_run(stage: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(stage, StageStatus::Skipped).with_detail(detail)
    }

    /// Creates a timed-out result.
    #[must_use]
    pub fn timed_out(stage: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(stage, StageStatus::TimedOut).with_detail(detail)
    }

    /// Sets the diagnostic detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Sets the attempt count.
    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Sets the start and end timestamps.
    #[must_use]
    pub fn with_timing(mut self, started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self.finished_at = Some(finished_at);
        self
    }

    /// Returns the wall-clock duration in milliseconds, if both timestamps
    /// are present.
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_succeeded_result() {
        let result = StageResult::succeeded("build").with_attempts(1);
        assert_eq!(result.stage, "build");
        assert_eq!(result.status, StageStatus::Succeeded);
        assert_eq!(result.attempts, 1);
        assert!(result.blocked_by.is_none());
    }

    #[test]
    fn test_skipped_result_carries_blocking_ancestor() {
        let result = StageResult::skipped("deploy", "quality");
        assert_eq!(result.status, StageStatus::Skipped);
        assert_eq!(result.blocked_by.as_deref(), Some("quality"));
        assert_eq!(result.attempts, 0);
    }

    #[test]
    fn test_duration_ms() {
        let start = Utc::now();
        let end = start + chrono::Duration::milliseconds(250);
        let result = StageResult::succeeded("scan").with_timing(start, end);
        assert_eq!(result.duration_ms(), Some(250));

        let bare = StageResult::skipped("deploy", "scan");
        assert_eq!(bare.duration_ms(), None);
    }

    #[test]
    fn test_result_serialization_roundtrip() {
        let result = StageResult::failed("deploy", "host unreachable").with_attempts(3);
        let json = serde_json::to_string(&result).unwrap();
        let back: StageResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.stage, "deploy");
        assert_eq!(back.status, StageStatus::Failed);
        assert_eq!(back.detail.as_deref(), Some("host unreachable"));
    }
}
