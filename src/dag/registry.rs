// src/dag/registry.rs

//! Task registry: the name -> task mapping everything else resolves against.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::engine::TaskName;
use crate::errors::{AssetflowError, Result};
use crate::pipeline::PipelineSpec;
use crate::types::ReloadKind;

/// The unit of work a task performs once its prerequisites are done.
#[derive(Debug, Clone)]
pub enum TaskAction {
    /// Read files matching the pipeline's globs, run them through its steps and
    /// write the results to its destination.
    Pipeline(PipelineSpec),
    /// Delete the given paths (missing paths are fine).
    Clean { paths: Vec<String> },
    /// No work; orders prerequisites only.
    Group,
    /// Requests a persistent session (preview server + watcher).
    Watch,
}

impl TaskAction {
    pub fn kind_str(&self) -> &'static str {
        match self {
            TaskAction::Pipeline(_) => "pipeline",
            TaskAction::Clean { .. } => "clean",
            TaskAction::Group => "group",
            TaskAction::Watch => "watch",
        }
    }
}

/// A named, immutable unit of build work.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: TaskName,
    pub action: TaskAction,
    /// Prerequisites, in declaration order.
    pub after: Vec<TaskName>,
    /// Reload signal pushed to preview clients when the task succeeds inside
    /// a watch session.
    pub reload: Option<ReloadKind>,
}

impl Task {
    pub fn new(name: impl Into<TaskName>, action: TaskAction) -> Self {
        Self {
            name: name.into(),
            action,
            after: Vec::new(),
            reload: None,
        }
    }

    pub fn group(name: impl Into<TaskName>) -> Self {
        Self::new(name, TaskAction::Group)
    }

    pub fn after(mut self, prerequisite: impl Into<TaskName>) -> Self {
        self.after.push(prerequisite.into());
        self
    }

    pub fn with_reload(mut self, kind: ReloadKind) -> Self {
        self.reload = Some(kind);
        self
    }
}

/// Registry of every declared task.
///
/// Tasks are registered once at startup and never mutated afterwards; lookups
/// hand out shared `Arc<Task>`s so scheduled work can outlive the borrow.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskName, Arc<Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task.
    ///
    /// Fails with `DuplicateTask` if the name is taken and with `DagCycle` if
    /// the task's prerequisites close a cycle among already registered tasks.
    /// On failure the registry is left untouched.
    ///
    /// Prerequisites that are not registered yet are allowed here; they are
    /// reported by [`TaskRegistry::validate`].
    pub fn register(&mut self, task: Task) -> Result<()> {
        if self.tasks.contains_key(&task.name) {
            return Err(AssetflowError::DuplicateTask(task.name));
        }

        if task.after.iter().any(|dep| dep == &task.name) {
            return Err(AssetflowError::DagCycle(format!(
                "task '{}' cannot depend on itself in `after`",
                task.name
            )));
        }

        self.check_acyclic_with(&task)?;

        debug!(task = %task.name, after = ?task.after, "registered task");
        self.tasks.insert(task.name.clone(), Arc::new(task));
        Ok(())
    }

    /// Look up a task by name.
    pub fn lookup(&self, name: &str) -> Result<&Arc<Task>> {
        self.tasks
            .get(name)
            .ok_or_else(|| AssetflowError::UnknownTask(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// All tasks, ordered by name.
    pub fn tasks(&self) -> impl Iterator<Item = &Arc<Task>> {
        self.tasks.values()
    }

    /// Check that every prerequisite refers to a registered task.
    pub fn validate(&self) -> Result<()> {
        for task in self.tasks.values() {
            for dep in task.after.iter() {
                if !self.tasks.contains_key(dep) {
                    return Err(AssetflowError::UnknownPrerequisite {
                        task: task.name.clone(),
                        prerequisite: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Names of the targets plus everything they transitively require.
    pub fn closure(&self, targets: &[TaskName]) -> Result<BTreeSet<TaskName>> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<TaskName> = Vec::new();

        for target in targets {
            self.lookup(target)?;
            stack.push(target.clone());
        }

        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let task = self.lookup(&name)?;
            for dep in task.after.iter() {
                if !self.tasks.contains_key(dep) {
                    return Err(AssetflowError::UnknownPrerequisite {
                        task: name.clone(),
                        prerequisite: dep.clone(),
                    });
                }
                stack.push(dep.clone());
            }
        }

        Ok(seen)
    }

    /// The closure of `targets` in an order where every task comes after its
    /// prerequisites.
    pub fn plan(&self, targets: &[TaskName]) -> Result<Vec<TaskName>> {
        let closure = self.closure(targets)?;

        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in closure.iter() {
            graph.add_node(name.as_str());
        }
        for name in closure.iter() {
            for dep in self.lookup(name)?.after.iter() {
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
        }

        let order = toposort(&graph, None).map_err(|cycle| {
            AssetflowError::DagCycle(format!(
                "cycle detected in task DAG involving task '{}'",
                cycle.node_id()
            ))
        })?;
        Ok(order.into_iter().map(str::to_string).collect())
    }

    fn check_acyclic_with(&self, candidate: &Task) -> Result<()> {
        // Edge direction: prerequisite -> task.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        graph.add_node(candidate.name.as_str());
        for name in self.tasks.keys() {
            graph.add_node(name.as_str());
        }

        let all = self
            .tasks
            .values()
            .map(|t| (t.name.as_str(), t.after.as_slice()))
            .chain(std::iter::once((
                candidate.name.as_str(),
                candidate.after.as_slice(),
            )));

        for (name, after) in all {
            for dep in after {
                if graph.contains_node(dep.as_str()) {
                    graph.add_edge(dep.as_str(), name, ());
                }
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(AssetflowError::DagCycle(format!(
                "cycle detected in task DAG involving task '{}'",
                cycle.node_id()
            ))),
        }
    }
}
