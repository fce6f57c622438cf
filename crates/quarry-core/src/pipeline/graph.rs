//! Fixed stage graphs.
//!
//! A workflow is declared as stages plus edges between `START`, the stage
//! names, and `END`. `build()` validates the declaration with `petgraph`
//! and flattens it into the ordered stage list the engine executes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use super::stage::BoxStage;

/// Entry sentinel.
pub const START: &str = "__start__";
/// Exit sentinel.
pub const END: &str = "__end__";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("workflow '{0}' has no stages")]
    Empty(String),

    #[error("edge references unknown stage '{0}'")]
    UnknownStage(String),

    #[error("stage '{0}' is declared twice")]
    DuplicateStage(String),

    #[error("cycle detected involving '{0}'")]
    CycleDetected(String),

    #[error("'{0}' branches; workflows must be a single path")]
    Branching(String),

    #[error("'{0}' is not reachable from start")]
    Unreachable(String),
}

// ---------------------------------------------------------------------------
// WorkflowGraph
// ---------------------------------------------------------------------------

/// A validated workflow: its stages in execution order.
#[derive(Debug)]
pub struct WorkflowGraph {
    name: String,
    stages: Vec<Arc<BoxStage>>,
}

impl WorkflowGraph {
    pub fn builder(name: impl Into<String>) -> WorkflowGraphBuilder {
        WorkflowGraphBuilder {
            name: name.into(),
            stages: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> &[Arc<BoxStage>] {
        &self.stages
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct WorkflowGraphBuilder {
    name: String,
    stages: Vec<BoxStage>,
    edges: Vec<(String, String)>,
}

impl WorkflowGraphBuilder {
    pub fn stage(mut self, stage: BoxStage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    /// Chain `START -> stages... -> END` in declaration order.
    pub fn linear(mut self) -> Self {
        let mut previous = START.to_string();
        for stage in &self.stages {
            self.edges.push((previous, stage.name().to_string()));
            previous = stage.name().to_string();
        }
        self.edges.push((previous, END.to_string()));
        self
    }

    /// Validate and flatten into execution order.
    pub fn build(self) -> Result<WorkflowGraph, GraphError> {
        if self.stages.is_empty() {
            return Err(GraphError::Empty(self.name));
        }

        let mut graph = DiGraph::<String, ()>::new();
        let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
        let start = graph.add_node(START.to_string());
        let end = graph.add_node(END.to_string());
        nodes.insert(START.to_string(), start);
        nodes.insert(END.to_string(), end);

        for stage in &self.stages {
            let name = stage.name().to_string();
            if nodes.contains_key(&name) {
                return Err(GraphError::DuplicateStage(name));
            }
            let idx = graph.add_node(name.clone());
            nodes.insert(name, idx);
        }

        for (from, to) in &self.edges {
            let from_idx = *nodes
                .get(from)
                .ok_or_else(|| GraphError::UnknownStage(from.clone()))?;
            let to_idx = *nodes
                .get(to)
                .ok_or_else(|| GraphError::UnknownStage(to.clone()))?;
            graph.update_edge(from_idx, to_idx, ());
        }

        toposort(&graph, None)
            .map_err(|cycle| GraphError::CycleDetected(graph[cycle.node_id()].clone()))?;

        for idx in graph.node_indices() {
            let out = graph.neighbors_directed(idx, Direction::Outgoing).count();
            let inc = graph.neighbors_directed(idx, Direction::Incoming).count();
            if out > 1 || inc > 1 {
                return Err(GraphError::Branching(graph[idx].clone()));
            }
        }

        // Walk the single path from START.
        let mut order: Vec<String> = Vec::new();
        let mut current = start;
        loop {
            let Some(next) = graph.neighbors_directed(current, Direction::Outgoing).next() else {
                return Err(GraphError::Unreachable(END.to_string()));
            };
            if next == end {
                break;
            }
            order.push(graph[next].clone());
            current = next;
        }

        let visited: HashSet<&str> = order.iter().map(String::as_str).collect();
        if let Some(orphan) = self.stages.iter().find(|s| !visited.contains(s.name())) {
            return Err(GraphError::Unreachable(orphan.name().to_string()));
        }

        let mut by_name: HashMap<String, BoxStage> = self
            .stages
            .into_iter()
            .map(|s| (s.name().to_string(), s))
            .collect();
        let stages = order
            .iter()
            .filter_map(|name| by_name.remove(name))
            .map(Arc::new)
            .collect();

        Ok(WorkflowGraph {
            name: self.name,
            stages,
        })
    }
}
