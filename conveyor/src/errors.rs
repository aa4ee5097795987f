//! Error types for the conveyor engine.
//!
//! The taxonomy separates errors that abort a run before it starts
//! (validation, configuration) from errors that are contained inside a run
//! (stage failures, delivery failures). Stage-local errors are recorded in
//! the run state and never propagate out of the executor.

use thiserror::Error;

/// The top-level error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The pipeline graph failed validation. Fatal; the run never starts.
    #[error("{0}")]
    Validation(#[from] GraphValidationError),

    /// A pipeline definition file could not be loaded or parsed.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// The run history archive could not be read or written.
    #[error("{0}")]
    History(#[from] HistoryError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error raised when a pipeline graph fails construction-time validation.
///
/// Every variant is detected by [`PipelineGraph::build`] before any stage
/// executes.
///
/// [`PipelineGraph::build`]: crate::pipeline::PipelineGraph::build
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphValidationError {
    /// The pipeline contains no stages.
    #[error("pipeline '{pipeline}' has no stages")]
    Empty {
        /// The pipeline name.
        pipeline: String,
    },

    /// A stage identifier appears more than once.
    #[error("duplicate stage id '{id}'")]
    DuplicateStage {
        /// The duplicated identifier.
        id: String,
    },

    /// A stage declares a dependency on an identifier that does not exist.
    #[error("stage '{stage}' depends on unknown stage '{dependency}'")]
    UnknownDependency {
        /// The stage declaring the dependency.
        stage: String,
        /// The missing identifier.
        dependency: String,
    },

    /// A stage depends on itself.
    #[error("stage '{id}' cannot depend on itself")]
    SelfDependency {
        /// The offending identifier.
        id: String,
    },

    /// The dependency edges contain a cycle.
    ///
    /// `stages` holds the residual set left unsorted after a stable
    /// topological pass, in sorted order.
    #[error("dependency cycle among stages: {}", stages.join(", "))]
    Cycle {
        /// Stages participating in the cycle.
        stages: Vec<String>,
    },
}

/// Error raised by an external collaborator call inside a stage attempt.
///
/// These are contained: the executor retries up to the stage's configured
/// count and then finalizes the stage as `Failed`.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    /// A scanner invocation failed to run.
    #[error("scan failed: {0}")]
    Scan(String),

    /// The image build failed.
    #[error("image build failed: {0}")]
    Build(String),

    /// The image push failed.
    #[error("image push failed: {0}")]
    Push(String),

    /// Deployment to the target host failed.
    #[error("deploy failed: {0}")]
    Deploy(String),

    /// An external command exited unsuccessfully or could not be spawned.
    #[error("command failed: {0}")]
    Command(String),

    /// A run-scoped artifact key was written twice.
    #[error("artifact conflict: key '{0}' already recorded")]
    ArtifactConflict(String),

    /// A stage required an artifact that no upstream stage produced.
    #[error("missing artifact '{0}'")]
    MissingArtifact(String),

    /// Any other collaborator failure.
    #[error("{0}")]
    Other(String),
}

/// Error raised when a notification could not be delivered.
///
/// Delivery failure is logged and surfaced as a warning on the run report;
/// it never changes the run's pass/fail status.
#[derive(Debug, Clone, Error)]
#[error("notification via {channel} failed: {message}")]
pub struct DeliveryError {
    /// The delivery channel (e.g. "email", "log").
    pub channel: String,
    /// What went wrong.
    pub message: String,
}

impl DeliveryError {
    /// Creates a new delivery error.
    #[must_use]
    pub fn new(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            message: message.into(),
        }
    }
}

/// Error raised while loading a pipeline definition file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read pipeline definition '{path}': {source}")]
    Read {
        /// The offending path.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// The file contents are not a valid definition.
    #[error("invalid pipeline definition '{path}': {source}")]
    Parse {
        /// The offending path.
        path: String,
        /// The underlying parse error.
        source: serde_json::Error,
    },
}

/// Error raised by the append-only run history archive.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The archive file could not be opened, read, or appended.
    #[error("archive IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record could not be encoded or decoded.
    #[error("archive record error: {0}")]
    Record(#[from] serde_json::Error),
}
