//! Terminal run notification.
//!
//! The executor invokes the notifier exactly once per run, after the
//! terminal state is reached. Delivery failure is logged and surfaced as a
//! warning on the final report; it never changes the run's pass/fail
//! status.

use crate::errors::DeliveryError;
use crate::run::RunSummary;
use async_trait::async_trait;

/// A delivery channel for the terminal run summary.
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Delivers the summary.
    async fn notify(&self, summary: &RunSummary) -> Result<(), DeliveryError>;
}

/// Writes the summary to the log. The default channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(&self, summary: &RunSummary) -> Result<(), DeliveryError> {
        tracing::info!(
            pipeline = %summary.pipeline,
            run_id = %summary.run.run_id,
            status = %summary.status,
            "run summary:\n{}",
            summary.render()
        );
        Ok(())
    }
}

/// Collects summaries in memory and can be scripted to fail, for tests.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    sent: parking_lot::RwLock<Vec<RunSummary>>,
    fail_with: Option<String>,
}

impl CollectingNotifier {
    /// Creates a notifier that accepts every summary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a notifier whose every delivery fails with the message.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            sent: parking_lot::RwLock::new(Vec::new()),
            fail_with: Some(message.into()),
        }
    }

    /// Returns the delivered summaries.
    #[must_use]
    pub fn sent(&self) -> Vec<RunSummary> {
        self.sent.read().clone()
    }

    /// Returns how many deliveries were attempted.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.sent.read().len()
    }
}

#[async_trait]
impl Notifier for CollectingNotifier {
    async fn notify(&self, summary: &RunSummary) -> Result<(), DeliveryError> {
        self.sent.write().push(summary.clone());
        match &self.fail_with {
            Some(message) => Err(DeliveryError::new("collecting", message.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RunStatus, StageResult};
    use crate::run::RunIdentity;

    fn summary() -> RunSummary {
        RunSummary {
            pipeline: "ci".to_string(),
            run: RunIdentity::new(),
            status: RunStatus::Succeeded,
            stages: vec![StageResult::succeeded("quality")],
        }
    }

    #[tokio::test]
    async fn test_logging_notifier_accepts() {
        let notifier = LoggingNotifier;
        assert!(notifier.notify(&summary()).await.is_ok());
    }

    #[tokio::test]
    async fn test_collecting_notifier_records() {
        let notifier = CollectingNotifier::new();
        notifier.notify(&summary()).await.unwrap();

        assert_eq!(notifier.attempts(), 1);
        assert_eq!(notifier.sent()[0].pipeline, "ci");
    }

    #[tokio::test]
    async fn test_failing_notifier_still_records_attempt() {
        let notifier = CollectingNotifier::failing("mailbox full");
        let err = notifier.notify(&summary()).await.unwrap_err();

        assert!(err.to_string().contains("mailbox full"));
        assert_eq!(notifier.attempts(), 1);
    }
}
