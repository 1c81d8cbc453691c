// src/exec/task_runner.rs

//! Individual task runner.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::dag::{ScheduledTask, TaskAction};
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::errors::{AssetflowError, Result};
use crate::exec::ExecContext;
use crate::pipeline;

/// Run a single task's action and emit exactly one `TaskCompleted` event.
pub async fn run_task(task: ScheduledTask, ctx: ExecContext, runtime_tx: mpsc::Sender<RuntimeEvent>) {
    let started = Instant::now();
    info!(
        task = %task.name,
        run_id = task.run_id,
        kind = task.task.action.kind_str(),
        "starting task"
    );

    let (outcome, written) = match execute(&task, &ctx).await {
        Ok(written) => {
            info!(
                task = %task.name,
                run_id = task.run_id,
                files = written.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "task finished"
            );
            (TaskOutcome::Success, written)
        }
        Err(err) => {
            error!(
                task = %task.name,
                run_id = task.run_id,
                error = %err,
                "task failed"
            );
            (TaskOutcome::Failed(err.to_string()), Vec::new())
        }
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
            written,
        })
        .await
        .is_err()
    {
        debug!(task = %task.name, "runtime gone before completion could be reported");
    }
}

/// Perform the task's action; returns the files written.
pub async fn execute(task: &ScheduledTask, ctx: &ExecContext) -> Result<Vec<PathBuf>> {
    match &task.task.action {
        TaskAction::Pipeline(spec) => {
            pipeline::run(&task.name, spec, &ctx.project_root, &ctx.cache).await
        }
        TaskAction::Clean { paths } => {
            for path in paths {
                remove_path(&ctx.project_root.join(path)).await?;
            }
            Ok(Vec::new())
        }
        TaskAction::Group | TaskAction::Watch => Ok(Vec::new()),
    }
}

/// Delete a file or directory tree; a missing path is not an error.
async fn remove_path(path: &Path) -> Result<()> {
    let meta = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = ?path, "nothing to clean");
            return Ok(());
        }
        Err(e) => return Err(AssetflowError::fs(path, e)),
    };

    let res = if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    match res {
        Ok(()) => {
            info!(path = ?path, "removed");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AssetflowError::fs(path, e)),
    }
}
