//! Gate policies: per-stage decisions on whether downstream work proceeds.

use crate::core::StageResult;
use crate::pipeline::StageSpec;

/// The decision a gate makes from a stage's terminal result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Dependents may be dispatched.
    Proceed,
    /// Every transitive dependent is skipped.
    Block,
}

impl GateDecision {
    /// Returns true for [`GateDecision::Block`].
    #[must_use]
    pub fn is_block(&self) -> bool {
        matches!(self, Self::Block)
    }
}

/// Decides, from a stage's outcome, whether its dependents may run.
///
/// Policies are pure functions of the spec and result; they hold no run
/// state. Each stage carries its own policy, which keeps the executor
/// stage-agnostic: a vulnerability scan and a quality scan block their
/// dependents through the same rule rather than per-stage conditionals.
pub trait GatePolicy: Send + Sync + std::fmt::Debug {
    /// Makes the proceed/block decision for one terminal result.
    fn decide(&self, spec: &StageSpec, result: &StageResult) -> GateDecision;
}

/// The default policy: block iff the stage failed or timed out.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockOnFailure;

impl GatePolicy for BlockOnFailure {
    fn decide(&self, _spec: &StageSpec, result: &StageResult) -> GateDecision {
        if result.status.is_failure() {
            GateDecision::Block
        } else {
            GateDecision::Proceed
        }
    }
}

/// An advisory gate: the stage's outcome is reported but never blocks
/// downstream work. Models a non-blocking scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct Advisory;

impl GatePolicy for Advisory {
    fn decide(&self, _spec: &StageSpec, _result: &StageResult) -> GateDecision {
        GateDecision::Proceed
    }
}
