//! The on-disk pipeline definition consumed by `conveyor run`.
//!
//! Definitions are JSON: a pipeline name and a list of stages, each with a
//! shell command, dependencies, and execution knobs. A definition compiles
//! into a [`PipelineGraph`] of [`CommandAction`] stages.

use super::{PipelineGraph, StageSpec};
use crate::collaborators::CommandAction;
use crate::errors::{ConfigError, GraphValidationError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn default_timeout_secs() -> u64 {
    600
}

/// How a stage's outcome gates its dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    /// Failure or timeout blocks every transitive dependent.
    #[default]
    Blocking,
    /// The outcome is recorded but never blocks downstream work.
    Advisory,
}

/// One stage in a definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Unique stage id.
    pub id: String,
    /// Upstream stage ids.
    #[serde(default)]
    pub needs: Vec<String>,
    /// Shell command to run.
    pub run: String,
    /// Per-attempt timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts after the first.
    #[serde(default)]
    pub retries: u32,
    /// Gate mode.
    #[serde(default)]
    pub gate: GateMode,
}

/// A whole pipeline definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Pipeline name.
    pub name: String,
    /// Stage list.
    #[serde(default)]
    pub stages: Vec<StageDefinition>,
}

impl PipelineDefinition {
    /// Loads a definition from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parses a definition from a JSON string.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Compiles the definition into an executable graph.
    pub fn into_graph(self) -> Result<PipelineGraph, GraphValidationError> {
        let specs = self
            .stages
            .into_iter()
            .map(|stage| {
                let mut spec =
                    StageSpec::new(stage.id, Arc::new(CommandAction::shell(stage.run)))
                        .with_needs(stage.needs)
                        .with_timeout(Duration::from_secs(stage.timeout_secs))
                        .with_retries(stage.retries);
                if stage.gate == GateMode::Advisory {
                    spec = spec.advisory();
                }
                spec
            })
            .collect();
        PipelineGraph::build(self.name, specs)
    }
}
