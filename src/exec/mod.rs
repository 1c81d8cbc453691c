// src/exec/mod.rs

//! Task execution layer.
//!
//! This module runs the actions of scheduled tasks (pipelines, cleans) on
//! Tokio tasks and reports back to the orchestration runtime via
//! `RuntimeEvent`s.
//!
//! - [`executor_loop`] owns the loop that receives scheduled tasks.
//! - [`task_runner`] runs a single task's action.
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `RealExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

use std::path::PathBuf;
use std::sync::Arc;

use crate::pipeline::ContentCache;

pub mod backend;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;

/// Everything a task needs besides its own definition.
#[derive(Debug, Clone)]
pub struct ExecContext {
    /// Directory all task paths are relative to.
    pub project_root: PathBuf,
    pub cache: Arc<ContentCache>,
}

impl ExecContext {
    pub fn new(project_root: impl Into<PathBuf>, cache: ContentCache) -> Self {
        Self {
            project_root: project_root.into(),
            cache: Arc::new(cache),
        }
    }
}
