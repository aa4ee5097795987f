//! Per-stage specification.

use crate::collaborators::StageAction;
use crate::errors::GraphValidationError;
use crate::gate::{Advisory, BlockOnFailure, GatePolicy};
use crate::retry::RetryConfig;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Specification for a single stage: identity, upstream dependencies, the
/// external action, and the execution knobs.
///
/// Specs are defined once per pipeline and read-only thereafter; a
/// [`PipelineGraph`] owns them for the lifetime of the definition.
///
/// [`PipelineGraph`]: crate::pipeline::PipelineGraph
#[derive(Debug, Clone)]
pub struct StageSpec {
    /// Unique identifier within the graph.
    pub id: String,
    /// Identifiers of upstream stages that must complete first.
    pub needs: HashSet<String>,
    /// The external action invoked once per attempt.
    pub action: Arc<dyn StageAction>,
    /// Per-attempt deadline.
    pub timeout: Duration,
    /// Extra attempts after the first (total attempts = `retries + 1`).
    pub retries: u32,
    /// Backoff between attempts.
    pub retry: RetryConfig,
    /// The gate applied to this stage's terminal result.
    pub gate: Arc<dyn GatePolicy>,
}

impl StageSpec {
    /// Creates a spec with default timeout, no retries, and the blocking
    /// gate.
    #[must_use]
    pub fn new(id: impl Into<String>, action: Arc<dyn StageAction>) -> Self {
        Self {
            id: id.into(),
            needs: HashSet::new(),
            action,
            timeout: DEFAULT_TIMEOUT,
            retries: 0,
            retry: RetryConfig::default(),
            gate: Arc::new(BlockOnFailure),
        }
    }

    /// Adds one upstream dependency.
    #[must_use]
    pub fn with_need(mut self, id: impl Into<String>) -> Self {
        self.needs.insert(id.into());
        self
    }

    /// Sets the upstream dependencies.
    #[must_use]
    pub fn with_needs(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.needs = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry count (attempts = `retries + 1`).
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the backoff configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets a custom gate policy.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<dyn GatePolicy>) -> Self {
        self.gate = gate;
        self
    }

    /// Makes this stage's gate advisory: its failure never blocks
    /// dependents.
    #[must_use]
    pub fn advisory(mut self) -> Self {
        self.gate = Arc::new(Advisory);
        self
    }

    /// Validates the spec in isolation.
    pub fn validate(&self) -> Result<(), GraphValidationError> {
        if self.needs.contains(&self.id) {
            return Err(GraphValidationError::SelfDependency {
                id: self.id.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockAction;

    #[test]
    fn test_spec_defaults() {
        let spec = StageSpec::new("quality", Arc::new(MockAction::succeeding()));
        assert_eq!(spec.id, "quality");
        assert!(spec.needs.is_empty());
        assert_eq!(spec.retries, 0);
        assert_eq!(spec.timeout, Duration::from_secs(600));
    }

    #[test]
    fn test_spec_builder() {
        let spec = StageSpec::new("deploy", Arc::new(MockAction::succeeding()))
            .with_needs(["build", "security"])
            .with_timeout(Duration::from_secs(60))
            .with_retries(2);

        assert_eq!(spec.needs.len(), 2);
        assert!(spec.needs.contains("build"));
        assert_eq!(spec.retries, 2);
    }

    #[test]
    fn test_self_dependency_rejected() {
        let spec = StageSpec::new("build", Arc::new(MockAction::succeeding())).with_need("build");
        assert!(matches!(
            spec.validate(),
            Err(GraphValidationError::SelfDependency { .. })
        ));
    }
}
