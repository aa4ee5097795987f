//! # Conveyor
//!
//! A push-to-deploy pipeline engine.
//!
//! Conveyor takes a set of stages with dependency edges, validates them
//! into a DAG, and drives them to completion under a concurrency budget:
//!
//! - **Gated execution**: a failed blocking stage skips every transitive
//!   dependent, with the blocking ancestor named on the skip
//! - **Bounded retries**: transient collaborator errors are retried with
//!   jittered exponential backoff; definitive verdicts are not
//! - **Timeouts**: per-attempt stage deadlines plus a global run deadline
//!   with cooperative cancellation and a wind-down grace period
//! - **Exactly-once notification**: the terminal summary goes out once,
//!   and delivery failure never changes the run's status
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use conveyor::prelude::*;
//!
//! let graph = PipelineGraph::build("ci", vec![
//!     StageSpec::new("quality", quality_action),
//!     StageSpec::new("security", security_action),
//!     StageSpec::new("build", build_action).with_needs(["quality", "security"]),
//!     StageSpec::new("deploy", deploy_action).with_need("build"),
//! ])?;
//!
//! let report = Executor::default().run(&graph, RunIdentity::new()).await;
//! println!("{}", report.render());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod collaborators;
pub mod core;
pub mod errors;
pub mod events;
pub mod executor;
pub mod gate;
pub mod history;
pub mod notify;
pub mod observability;
pub mod pipeline;
pub mod retry;
pub mod run;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancelToken;
    pub use crate::collaborators::{
        ActionContext, ActionOutcome, ArtifactBag, StageAction,
    };
    pub use crate::core::{RunStatus, StageResult, StageStatus};
    pub use crate::errors::{
        ConfigError, DeliveryError, EngineError, GraphValidationError, StageError,
    };
    pub use crate::events::{EventSink, NoOpEventSink, RunEvent, TracingEventSink};
    pub use crate::executor::{Executor, ExecutorConfig};
    pub use crate::gate::{BlockOnFailure, GateDecision, GatePolicy};
    pub use crate::history::RunArchive;
    pub use crate::notify::{LoggingNotifier, Notifier};
    pub use crate::pipeline::{
        PipelineDefinition, PipelineGraph, StageDefinition, StageSpec,
    };
    pub use crate::retry::{BackoffStrategy, JitterStrategy, RetryConfig};
    pub use crate::run::{RunIdentity, RunReport, RunSummary};
}
