//! Pipeline graphs: stage specifications, DAG validation, and the on-disk
//! definition format.

mod definition;
mod graph;
mod spec;

pub use definition::{GateMode, PipelineDefinition, StageDefinition};
pub use graph::PipelineGraph;
pub use spec::StageSpec;
