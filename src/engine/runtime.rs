// src/engine/runtime.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::types::ReloadKind;

use super::core::CoreRuntime;
use super::report::RunReport;
use super::{CoreCommand, CoreStep, RuntimeEvent, TaskName};

/// Receiver of reload and failure notifications produced by the core.
///
/// The preview server's `ReloadHub` implements this; tests can record calls.
pub trait ReloadNotifier: Send + Sync + fmt::Debug {
    /// Files written by a task with a `reload` setting (or matched by a
    /// reload-only watch rule).
    fn files_changed(&self, kind: ReloadKind, paths: &[PathBuf]);

    /// A task failed; `message` is the error text.
    fn task_failed(&self, task: &str, message: &str);
}

/// Drives the DAG scheduler in response to `RuntimeEvent`s,
/// and delegates actual task execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics. This struct handles async IO: reading events from
/// channels, dispatching tasks to the executor and forwarding notifications.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    notifier: Option<Arc<dyn ReloadNotifier>>,
    seed: Vec<TaskName>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("notifier", &self.notifier)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
            notifier: None,
            seed: Vec::new(),
        }
    }

    /// Forward reload and failure notifications to `notifier`.
    pub fn with_notifier(mut self, notifier: Arc<dyn ReloadNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Start with a single run containing all of `targets`.
    pub fn with_seed(mut self, targets: Vec<TaskName>) -> Self {
        self.seed = targets;
        self
    }

    /// Main event loop.
    ///
    /// - Seeds the first run, if any targets were given.
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core (spawn tasks, notify, exit).
    ///
    /// Returns the report of the last run.
    pub async fn run(mut self) -> Result<RunReport> {
        info!("assetflow runtime started");

        let seed = std::mem::take(&mut self.seed);
        if !seed.is_empty() {
            let step = self.core.seed(seed);
            if !self.apply(step).await? {
                info!("nothing to run; stopping runtime");
                return Ok(self.core.into_report());
            }
        }

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            if !self.apply(step).await? {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!("runtime exiting");
        Ok(self.core.into_report())
    }

    /// Execute a step's commands; returns whether to keep running.
    async fn apply(&mut self, step: CoreStep) -> Result<bool> {
        for command in step.commands {
            self.execute_command(command).await?;
        }
        Ok(step.keep_running)
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => {
                self.spawn_ready(tasks).await?;
            }
            CoreCommand::NotifyReload { kind, paths } => {
                debug!(?kind, count = paths.len(), "notifying reload");
                if let Some(notifier) = &self.notifier {
                    notifier.files_changed(kind, &paths);
                }
            }
            CoreCommand::ReportFailure { task, message } => {
                if let Some(notifier) = &self.notifier {
                    notifier.task_failed(&task, &message);
                }
            }
            CoreCommand::RequestExit => {
                // keep_running is already false in this case.
                info!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        let run_ids: Vec<_> = tasks.iter().map(|t| t.run_id).collect();
        debug!(?names, ?run_ids, "spawning ready tasks");

        self.executor.dispatch(tasks).await
    }
}
