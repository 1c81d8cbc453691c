// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::dag::{ScheduledTask, Scheduler, SchedulerStep, TaskRunState};
use crate::engine::queue::TriggerQueue;
use crate::engine::report::RunReport;
use crate::engine::{RuntimeOptions, TaskName, TaskOutcome, TriggerReason};
use crate::types::ReloadKind;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Tell connected preview clients that these files changed.
    NotifyReload { kind: ReloadKind, paths: Vec<PathBuf> },
    /// Tell connected preview clients that a task failed.
    ReportFailure { task: TaskName, message: String },
    /// Request that the process exits (one-shot mode when idle).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute (send tasks, notify, exit).
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle a task trigger event.
///
/// - If the scheduler is idle, we start a new run seeded with this trigger.
/// - If a run is active:
///   - If `task` is already participating in this run (or the run has
///     already failed), the trigger waits in the queue for a future run.
///   - Otherwise the task joins the active run immediately, so a change to
///     one stylesheet does not wait on an unrelated image task.
pub fn handle_task_trigger(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    report: &mut RunReport,
    options: &RuntimeOptions,
    task: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    debug!(task = %task, ?reason, "handling trigger");

    if scheduler.is_idle() {
        let commands = start_new_run_from_triggers(scheduler, report, vec![task]);
        return finish_step(scheduler, queue, options, commands);
    }

    let mut commands = Vec::new();
    match scheduler.run_state_of(&task) {
        None => {
            warn!(task = %task, "trigger for unknown task; ignoring");
        }
        Some(TaskRunState::NotInRun) if !scheduler.current_run_failed() => {
            let step = scheduler.step_trigger(&task);
            apply_step(report, step, &mut commands);
        }
        Some(_) => {
            queue.record_trigger(&task);
        }
    }

    CoreStep::running(commands)
}

/// Handle a task completion event.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    report: &mut RunReport,
    options: &RuntimeOptions,
    task: TaskName,
    outcome: TaskOutcome,
    written: Vec<PathBuf>,
) -> CoreStep {
    let mut commands = Vec::new();

    let was_running = scheduler.run_state_of(&task) == Some(TaskRunState::Running);
    let step = scheduler.step_completion(&task, &outcome);

    if was_running {
        match &outcome {
            TaskOutcome::Success => {
                report.succeeded.push(task.clone());
                report.written.extend(written.iter().cloned());

                let reload = scheduler.task(&task).and_then(|t| t.reload);
                if let Some(kind) = reload {
                    if written.is_empty() {
                        debug!(task = %task, "task wrote nothing; no reload");
                    } else {
                        commands.push(CoreCommand::NotifyReload {
                            kind,
                            paths: written,
                        });
                    }
                }
            }
            TaskOutcome::Failed(message) => {
                report.failed.push((task.clone(), message.clone()));
                commands.push(CoreCommand::ReportFailure {
                    task: task.clone(),
                    message: message.clone(),
                });
            }
        }
    }

    apply_step(report, step, &mut commands);
    commands.extend(maybe_start_queued_run(scheduler, queue, report));

    finish_step(scheduler, queue, options, commands)
}

/// A watch rule without tasks asked for a reload of `paths`.
pub fn handle_reload_request(kind: ReloadKind, paths: Vec<PathBuf>) -> CoreStep {
    CoreStep::running(vec![CoreCommand::NotifyReload { kind, paths }])
}

/// Stop taking work.
///
/// Queued triggers are dropped and tasks that have not started are skipped.
/// The loop keeps running while tasks are still in flight so that their
/// completions reach the report.
pub fn handle_shutdown(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    report: &mut RunReport,
) -> CoreStep {
    let dropped = queue.clear();
    if dropped > 0 {
        info!(dropped, "dropping queued triggers on shutdown");
    }

    let mut commands = Vec::new();
    let step = scheduler.step_halt();
    apply_step(report, step, &mut commands);

    let draining = !scheduler.is_idle();
    if draining {
        info!(
            tasks = ?scheduler.tasks_in_current_run(),
            "waiting for running tasks before shutting down"
        );
    }

    CoreStep {
        commands,
        keep_running: draining,
    }
}

/// Seed a new run from initial root triggers.
///
/// All roots share one run, so a prerequisite requested by several of them
/// runs once.
pub fn start_new_run_from_triggers(
    scheduler: &mut Scheduler,
    report: &mut RunReport,
    triggers: Vec<TaskName>,
) -> Vec<CoreCommand> {
    let mut commands = Vec::new();

    if triggers.is_empty() {
        return commands;
    }

    scheduler.start_new_run();
    *report = RunReport::default();

    for task in triggers {
        let step = scheduler.step_trigger(&task);
        apply_step(report, step, &mut commands);
    }

    commands
}

/// Exit check shared by every handler that can leave the scheduler idle.
pub fn finish_step(
    scheduler: &Scheduler,
    queue: &TriggerQueue,
    options: &RuntimeOptions,
    mut commands: Vec<CoreCommand>,
) -> CoreStep {
    let mut keep_running = true;
    if options.exit_when_idle && scheduler.is_idle() && queue.is_empty() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}

fn apply_step(report: &mut RunReport, step: SchedulerStep, commands: &mut Vec<CoreCommand>) {
    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }
    if !step.newly_skipped.is_empty() {
        info!(skipped = ?step.newly_skipped, "skipping tasks after failure");
        report.skipped.extend(step.newly_skipped);
    }
    if step.run_just_finished {
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            written = report.written.len(),
            "run finished"
        );
    }
}

/// If the scheduler is idle and there are queued triggers, start the next run.
///
/// The oldest trigger seeds the run. Following triggers for tasks that are
/// not part of it join immediately; the first one that would re-run a task
/// already in the run stays queued.
fn maybe_start_queued_run(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    report: &mut RunReport,
) -> Vec<CoreCommand> {
    if !scheduler.is_idle() {
        return Vec::new();
    }

    let Some(first) = queue.pop_front() else {
        return Vec::new();
    };

    let mut commands = start_new_run_from_triggers(scheduler, report, vec![first]);

    while let Some(next) = queue.front() {
        if scheduler.is_idle()
            || scheduler.run_state_of(next) != Some(TaskRunState::NotInRun)
        {
            break;
        }
        if let Some(next) = queue.pop_front() {
            let step = scheduler.step_trigger(&next);
            apply_step(report, step, &mut commands);
        }
    }

    commands
}
