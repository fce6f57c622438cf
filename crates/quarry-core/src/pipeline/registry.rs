//! Name -> workflow registry.
//!
//! Names are case-insensitive: they are lowercased on register and lookup.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::graph::WorkflowGraph;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("workflow '{0}' is already registered")]
    Collision(String),

    #[error("workflow '{name}' not found. Available: [{}]", .available.join(", "))]
    NotFound { name: String, available: Vec<String> },
}

/// Registered workflows, keyed by lowercase name.
#[derive(Debug, Default)]
pub struct WorkflowRegistry {
    workflows: BTreeMap<String, Arc<WorkflowGraph>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validated graph under `name`.
    pub fn register(&mut self, name: &str, graph: WorkflowGraph) -> Result<(), RegistryError> {
        let key = name.trim().to_lowercase();
        if self.workflows.contains_key(&key) {
            return Err(RegistryError::Collision(key));
        }
        tracing::debug!(workflow = %key, stages = graph.len(), "registered workflow");
        self.workflows.insert(key, Arc::new(graph));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<WorkflowGraph>, RegistryError> {
        let key = name.trim().to_lowercase();
        self.workflows
            .get(&key)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
                available: self.names(),
            })
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.workflows.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<WorkflowGraph>)> {
        self.workflows.iter().map(|(k, v)| (k.as_str(), v))
    }
}
