// src/engine/report.rs

use std::path::PathBuf;

use crate::engine::TaskName;
use crate::errors::{AssetflowError, Result};

/// What happened during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub succeeded: Vec<TaskName>,
    /// Failed tasks with their messages, in the order they failed.
    pub failed: Vec<(TaskName, String)>,
    /// Tasks that never started because of a failure.
    pub skipped: Vec<TaskName>,
    /// Every file written by the run's tasks.
    pub written: Vec<PathBuf>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn first_failure(&self) -> Option<&(TaskName, String)> {
        self.failed.first()
    }

    /// Turn a failed report into `TaskFailed` for its first failure.
    pub fn into_result(self) -> Result<RunReport> {
        match self.failed.first() {
            Some((task, message)) => Err(AssetflowError::TaskFailed {
                task: task.clone(),
                message: message.clone(),
            }),
            None => Ok(self),
        }
    }
}
