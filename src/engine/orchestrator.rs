// src/engine/orchestrator.rs

//! One-shot runs: execute targets and their prerequisites, then stop.

use tokio::sync::mpsc;
use tracing::info;

use crate::dag::{Scheduler, TaskRegistry};
use crate::engine::core::CoreRuntime;
use crate::engine::report::RunReport;
use crate::engine::runtime::Runtime;
use crate::engine::{RuntimeEvent, RuntimeOptions, TaskName};
use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::types::TriggerWhileRunningBehaviour;

/// Run `targets` (and everything they require) once, in a single run.
///
/// Targets are resolved before anything starts: an unknown target fails with
/// `UnknownTask`, a missing prerequisite with `UnknownPrerequisite`.
///
/// The returned report describes the run even when tasks failed; use
/// [`RunReport::into_result`] to turn the first failure into an error.
pub async fn run_once<E, F>(
    registry: &TaskRegistry,
    targets: &[TaskName],
    make_executor: F,
) -> Result<RunReport>
where
    E: ExecutorBackend,
    F: FnOnce(mpsc::Sender<RuntimeEvent>) -> E,
{
    let closure = registry.closure(targets)?;
    if closure.is_empty() {
        return Ok(RunReport::default());
    }
    info!(targets = ?targets, tasks = closure.len(), "starting one-shot run");

    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = make_executor(tx);

    let core = CoreRuntime::new(
        Scheduler::from_registry(registry),
        TriggerWhileRunningBehaviour::Queue,
        1,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );

    Runtime::new(core, rx, executor)
        .with_seed(targets.to_vec())
        .run()
        .await
}
