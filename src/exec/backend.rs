// src/exec/backend.rs

//! Where the runtime sends tasks that are ready to run.
//!
//! [`RealExecutorBackend`] hands them to the executor loop, which runs
//! pipelines and clean tasks on the project tree. Tests plug in a backend
//! that reports completions straight back to the runtime.

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::mpsc;

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::{AssetflowError, Result};

use super::ExecContext;
use super::executor_loop::spawn_executor;

pub trait ExecutorBackend: Send {
    /// Start `tasks`. Each one must eventually answer with a
    /// `RuntimeEvent::TaskCompleted` on the runtime channel.
    fn dispatch(&mut self, tasks: Vec<ScheduledTask>) -> BoxFuture<'_, Result<()>>;
}

/// Production backend: forwards tasks to the background executor loop.
pub struct RealExecutorBackend {
    tx: mpsc::Sender<ScheduledTask>,
}

impl std::fmt::Debug for RealExecutorBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealExecutorBackend").finish_non_exhaustive()
    }
}

impl RealExecutorBackend {
    /// Spawns the executor loop; completions go to `runtime_tx`.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, ctx: ExecContext) -> Self {
        let tx = spawn_executor(runtime_tx, ctx);
        Self { tx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn dispatch(&mut self, tasks: Vec<ScheduledTask>) -> BoxFuture<'_, Result<()>> {
        let tx = self.tx.clone();

        async move {
            for task in tasks {
                let name = task.name.clone();
                tx.send(task).await.map_err(|_| {
                    AssetflowError::Other(anyhow::anyhow!(
                        "executor loop closed before task '{name}' could be dispatched"
                    ))
                })?;
            }
            Ok(())
        }
        .boxed()
    }
}
