//! Event sink trait and implementations.

use super::RunEvent;

/// Receives run events for observability.
///
/// Emission must never fail; sinks swallow their own errors.
pub trait EventSink: Send + Sync + std::fmt::Debug {
    /// Consumes one event.
    fn emit(&self, event: &RunEvent);
}

/// Discards all events. The default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: &RunEvent) {}
}

/// Logs events through the tracing framework with structured fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &RunEvent) {
        match event {
            RunEvent::StageRetrying {
                stage,
                attempt,
                delay_ms,
                error,
            } => {
                tracing::warn!(%stage, attempt, delay_ms, %error, "stage attempt failed, retrying");
            }
            RunEvent::GateBlocked { stage } => {
                tracing::warn!(%stage, "gate blocked downstream stages");
            }
            RunEvent::RunCancelled { reason } => {
                tracing::warn!(%reason, "run cancelled");
            }
            RunEvent::NotifyFailed { error } => {
                tracing::warn!(%error, "notification delivery failed");
            }
            other => {
                tracing::info!(kind = other.kind(), payload = ?other, "pipeline event");
            }
        }
    }
}

/// Collects events in memory, for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<RunEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Returns the kinds of all collected events, in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.read().iter().map(RunEvent::kind).collect()
    }

    /// Counts events of the given kind.
    #[must_use]
    pub fn count_of(&self, kind: &str) -> usize {
        self.events
            .read()
            .iter()
            .filter(|e| e.kind() == kind)
            .count()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: &RunEvent) {
        self.events.write().push(event.clone());
    }
}
