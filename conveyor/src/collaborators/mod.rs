//! External collaborators and the action seam that binds them to stages.
//!
//! Every tool the pipeline touches (quality scanner, vulnerability scanner,
//! image build/push, deployment target) is reachable only through a narrow
//! async trait in [`ports`]. Adapter actions bridge each port to the
//! [`StageAction`] seam the executor dispatches.

mod actions;
mod bag;
mod command;
mod ports;
mod refs;

pub use actions::{BuildPushAction, DeployAction, QualityScanAction, VulnScanAction};
pub use bag::ArtifactBag;
pub use command::CommandAction;
pub use ports::{DeployTarget, ImageBuilder, QualityScanner, VulnScanner};
pub use refs::{
    Finding, HostRef, ImageRef, QualityReport, RegistryCredentials, ScanReport, SourceRef,
};

use crate::cancellation::CancelToken;
use crate::errors::StageError;
use crate::run::RunIdentity;
use async_trait::async_trait;
use std::sync::Arc;

/// What one stage attempt hands to its action.
#[derive(Debug, Clone)]
pub struct ActionContext {
    /// The run's identity (commit SHA, actor, run id).
    pub identity: RunIdentity,
    /// Run-scoped, write-once artifacts shared between stages.
    pub artifacts: Arc<ArtifactBag>,
    /// The run's cancellation token.
    pub cancel: Arc<CancelToken>,
}

impl ActionContext {
    /// Creates a context for one run.
    #[must_use]
    pub fn new(identity: RunIdentity, artifacts: Arc<ArtifactBag>, cancel: Arc<CancelToken>) -> Self {
        Self {
            identity,
            artifacts,
            cancel,
        }
    }
}

/// The result of one completed action call.
///
/// `passed: false` is a definitive outcome (the collaborator ran and
/// reported failure); it finalizes the stage as failed without retries.
/// Transport-level failures are returned as [`StageError`] instead and are
/// retried up to the stage's configured count.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    /// Whether the collaborator reported success.
    pub passed: bool,
    /// Diagnostic payload: report URL, finding summary, log reference.
    pub detail: Option<String>,
}

impl ActionOutcome {
    /// A passing outcome.
    #[must_use]
    pub fn passed() -> Self {
        Self {
            passed: true,
            detail: None,
        }
    }

    /// A definitive failure.
    #[must_use]
    pub fn failed() -> Self {
        Self {
            passed: false,
            detail: None,
        }
    }

    /// Attaches a diagnostic detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// One pipeline stage's unit of external work.
///
/// The executor makes exactly one `run` call per attempt.
#[async_trait]
pub trait StageAction: Send + Sync + std::fmt::Debug {
    /// Invokes the external collaborator once.
    async fn run(&self, ctx: &ActionContext) -> Result<ActionOutcome, StageError>;
}
