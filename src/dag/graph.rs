// src/dag/graph.rs

use std::collections::HashMap;

use crate::dag::registry::TaskRegistry;

/// Direct prerequisites of one task: those that must succeed before it runs.
#[derive(Debug, Clone)]
struct DagNode {
    deps: Vec<String>,
}

/// Simple in-memory DAG representation keyed by task name.
///
/// Acyclicity is enforced by [`TaskRegistry::register`]; here we only keep
/// adjacency information for scheduling and diagnostics.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: HashMap<String, DagNode>,
}

impl DagGraph {
    /// Build a DAG from a validated registry.
    pub fn from_registry(registry: &TaskRegistry) -> Self {
        let nodes = registry
            .tasks()
            .map(|task| {
                let node = DagNode {
                    deps: task.after.clone(),
                };
                (task.name.clone(), node)
            })
            .collect();

        Self { nodes }
    }

    /// Return all task names.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    /// Immediate prerequisites of a task (the tasks listed in its `after`).
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }
}
