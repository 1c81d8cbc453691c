// src/dag/mod.rs

//! Task registry, DAG representation and scheduling.
//!
//! - [`registry`] owns the declared tasks and rejects duplicates and cycles.
//! - [`graph`] keeps adjacency information derived from the registry.
//! - [`scheduler`] is the per-run state machine that decides which tasks are
//!   ready to run.
//! - [`task_info`] provides task metadata and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod graph;
pub mod registry;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::DagGraph;
pub use registry::{Task, TaskAction, TaskRegistry};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskRunState};
