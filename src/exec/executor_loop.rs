// src/exec/executor_loop.rs

//! Main executor loop that receives scheduled tasks.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::exec::ExecContext;
use crate::exec::task_runner::run_task;

/// Spawn the background executor loop.
///
/// The returned `mpsc::Sender<ScheduledTask>` is what `RealExecutorBackend`
/// uses to hand over work. Each scheduled task runs in its own Tokio task, so
/// independent tasks of a run proceed concurrently. The scheduler never
/// dispatches a task twice within one run, and a queued re-run only starts
/// after the previous run finished, so no per-name bookkeeping is needed here.
pub fn spawn_executor(
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    ctx: ExecContext,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        while let Some(task) = rx.recv().await {
            debug!(task = %task.name, run_id = task.run_id, "executor received task");
            let rt_tx = runtime_tx.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move {
                run_task(task, ctx, rt_tx).await;
            });
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}
