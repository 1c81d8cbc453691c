// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledTask`s to the executor
//! - forwarding reload notifications to preview clients
//! - handling Ctrl+C / shutdown
//!
//! The core is intended to be unit tested without any Tokio, channels,
//! filesystem, or processes.

use tracing::debug;

use crate::dag::Scheduler;
use crate::engine::event_handlers::{
    CoreStep, finish_step, handle_reload_request, handle_shutdown, handle_task_completion,
    handle_task_trigger, start_new_run_from_triggers,
};
use crate::engine::queue::TriggerQueue;
use crate::engine::report::RunReport;
use crate::engine::{RuntimeEvent, RuntimeOptions, TaskName};
use crate::types::TriggerWhileRunningBehaviour;

/// Pure core runtime state.
///
/// This owns:
/// - the DAG scheduler
/// - the trigger queue
/// - the report of the current (or last) run
/// - runtime options (e.g. `exit_when_idle`)
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    report: RunReport,
    options: RuntimeOptions,
    /// Set once `ShutdownRequested` arrives; only completions count after.
    shutting_down: bool,
}

impl CoreRuntime {
    pub fn new(
        scheduler: Scheduler,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        let queue = TriggerQueue::new(behaviour, queue_length);
        Self {
            scheduler,
            queue,
            report: RunReport::default(),
            options,
            shutting_down: false,
        }
    }

    /// Expose whether the scheduler is idle (for tests).
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Expose queue emptiness (for tests).
    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Report of the active run, or of the last finished one.
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }

    /// Start one run containing every root in `targets`.
    pub fn seed(&mut self, targets: Vec<TaskName>) -> CoreStep {
        let commands = start_new_run_from_triggers(&mut self.scheduler, &mut self.report, targets);
        finish_step(&self.scheduler, &self.queue, &self.options, commands)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        if self.shutting_down {
            return self.step_draining(event);
        }

        match event {
            RuntimeEvent::TaskTriggered { task, reason } => handle_task_trigger(
                &mut self.scheduler,
                &mut self.queue,
                &mut self.report,
                &self.options,
                task,
                reason,
            ),
            RuntimeEvent::TaskCompleted {
                task,
                outcome,
                written,
            } => handle_task_completion(
                &mut self.scheduler,
                &mut self.queue,
                &mut self.report,
                &self.options,
                task,
                outcome,
                written,
            ),
            RuntimeEvent::ReloadRequested { kind, paths } => handle_reload_request(kind, paths),
            RuntimeEvent::ShutdownRequested => {
                self.shutting_down = true;
                handle_shutdown(&mut self.scheduler, &mut self.queue, &mut self.report)
            }
        }
    }

    /// After shutdown: record completions of tasks still in flight, ignore
    /// everything else, and stop once the run is over.
    fn step_draining(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskCompleted {
                task,
                outcome,
                written,
            } => {
                let mut step = handle_task_completion(
                    &mut self.scheduler,
                    &mut self.queue,
                    &mut self.report,
                    &self.options,
                    task,
                    outcome,
                    written,
                );
                step.keep_running = step.keep_running && !self.scheduler.is_idle();
                step
            }
            other => {
                debug!(event = ?other, "shutting down; ignoring event");
                CoreStep {
                    commands: Vec::new(),
                    keep_running: !self.scheduler.is_idle(),
                }
            }
        }
    }
}
