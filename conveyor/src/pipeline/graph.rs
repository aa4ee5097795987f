//! The validated stage DAG.

use super::StageSpec;
use crate::errors::GraphValidationError;
use std::collections::{HashMap, HashSet, VecDeque};

/// A validated, immutable directed acyclic graph of stages.
///
/// Construction rejects duplicate identifiers, dangling dependency
/// references, self-dependencies, and cycles; a graph that builds is safe
/// to execute.
#[derive(Debug, Clone)]
pub struct PipelineGraph {
    name: String,
    stages: HashMap<String, StageSpec>,
    /// Reverse edges: stage id -> ids that depend on it directly.
    dependents: HashMap<String, Vec<String>>,
    /// Stable topological order, used for deterministic dispatch.
    order: Vec<String>,
}

impl PipelineGraph {
    /// Validates the specs and builds the graph.
    ///
    /// Cycles are detected with a stable topological pass (Kahn); any
    /// residual unsorted stages are reported as the cycle.
    pub fn build(
        name: impl Into<String>,
        specs: Vec<StageSpec>,
    ) -> Result<Self, GraphValidationError> {
        let name = name.into();
        if specs.is_empty() {
            return Err(GraphValidationError::Empty { pipeline: name });
        }

        let insertion_order: Vec<String> = specs.iter().map(|s| s.id.clone()).collect();
        let mut stages: HashMap<String, StageSpec> = HashMap::with_capacity(specs.len());
        for spec in specs {
            spec.validate()?;
            if stages.insert(spec.id.clone(), spec.clone()).is_some() {
                return Err(GraphValidationError::DuplicateStage { id: spec.id });
            }
        }

        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for id in &insertion_order {
            let spec = &stages[id];
            for need in &spec.needs {
                if !stages.contains_key(need) {
                    return Err(GraphValidationError::UnknownDependency {
                        stage: id.clone(),
                        dependency: need.clone(),
                    });
                }
                dependents.entry(need.clone()).or_default().push(id.clone());
            }
        }

        let order = stable_topological_sort(&stages, &dependents, &insertion_order)?;

        Ok(Self {
            name,
            stages,
            dependents,
            order,
        })
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true for a graph with no stages (never constructible via
    /// [`build`], kept for API completeness).
    ///
    /// [`build`]: PipelineGraph::build
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns the spec for a stage id.
    #[must_use]
    pub fn stage(&self, id: &str) -> Option<&StageSpec> {
        self.stages.get(id)
    }

    /// Returns all stage ids in stable topological order.
    #[must_use]
    pub fn stage_ids(&self) -> &[String] {
        &self.order
    }

    /// Returns the stages eligible to run: every dependency in `completed`
    /// and the stage itself not yet started. Topological order.
    #[must_use]
    pub fn ready_stages(
        &self,
        completed: &HashSet<String>,
        started: &HashSet<String>,
    ) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| !started.contains(*id))
            .filter(|id| self.stages[*id].needs.iter().all(|n| completed.contains(n)))
            .cloned()
            .collect()
    }

    /// Returns every stage transitively depending on `id`, in stable
    /// topological order.
    #[must_use]
    pub fn transitive_dependents(&self, id: &str) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(id);

        while let Some(current) = queue.pop_front() {
            if let Some(children) = self.dependents.get(current) {
                for child in children {
                    if seen.insert(child) {
                        queue.push_back(child);
                    }
                }
            }
        }

        self.order
            .iter()
            .filter(|stage| seen.contains(stage.as_str()))
            .cloned()
            .collect()
    }
}

/// Kahn's algorithm over the insertion order; the residue after the stable
/// pass is the cycle.
fn stable_topological_sort(
    stages: &HashMap<String, StageSpec>,
    dependents: &HashMap<String, Vec<String>>,
    insertion_order: &[String],
) -> Result<Vec<String>, GraphValidationError> {
    let mut in_degree: HashMap<&str, usize> = stages
        .iter()
        .map(|(id, spec)| (id.as_str(), spec.needs.len()))
        .collect();

    let mut frontier: VecDeque<&str> = insertion_order
        .iter()
        .map(String::as_str)
        .filter(|id| in_degree[*id] == 0)
        .collect();

    let mut order = Vec::with_capacity(stages.len());
    while let Some(id) = frontier.pop_front() {
        order.push(id.to_string());
        if let Some(children) = dependents.get(id) {
            for child in children {
                let degree = in_degree
                    .get_mut(child.as_str())
                    .unwrap_or_else(|| unreachable!("dependent of known stage"));
                *degree -= 1;
                if *degree == 0 {
                    frontier.push_back(child);
                }
            }
        }
    }

    if order.len() < stages.len() {
        let sorted: HashSet<&str> = order.iter().map(String::as_str).collect();
        let mut residue: Vec<String> = stages
            .keys()
            .filter(|id| !sorted.contains(id.as_str()))
            .cloned()
            .collect();
        residue.sort();
        return Err(GraphValidationError::Cycle { stages: residue });
    }

    Ok(order)
}
