// tests/core_runtime.rs

use std::path::PathBuf;

use assetflow::config::ConfigFile;
use assetflow::dag::Scheduler;
use assetflow::engine::{
    CoreCommand, CoreRuntime, CoreStep, RuntimeEvent, RuntimeOptions, TaskOutcome, TriggerReason,
};
use assetflow::types::{ReloadKind, TriggerWhileRunningBehaviour};
use assetflow_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};

fn config() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_task(
            "sass",
            TaskConfigBuilder::group().reload(ReloadKind::Inject).build(),
        )
        .with_task("scripts", TaskConfigBuilder::group().build())
        .with_task(
            "build",
            TaskConfigBuilder::group().after("sass").after("scripts").build(),
        )
        .build()
}

fn core(behaviour: TriggerWhileRunningBehaviour, exit_when_idle: bool) -> CoreRuntime {
    let cfg = config();
    CoreRuntime::new(
        Scheduler::from_registry(cfg.registry()),
        behaviour,
        16,
        RuntimeOptions { exit_when_idle },
    )
}

fn dispatched(step: &CoreStep) -> Vec<String> {
    let mut names = Vec::new();
    for command in &step.commands {
        if let CoreCommand::DispatchTasks(tasks) = command {
            names.extend(tasks.iter().map(|t| t.name.clone()));
        }
    }
    names.sort();
    names
}

fn trigger(task: &str) -> RuntimeEvent {
    RuntimeEvent::TaskTriggered {
        task: task.to_string(),
        reason: TriggerReason::FileWatch,
    }
}

fn done(task: &str) -> RuntimeEvent {
    RuntimeEvent::TaskCompleted {
        task: task.to_string(),
        outcome: TaskOutcome::Success,
        written: Vec::new(),
    }
}

#[test]
fn trigger_for_task_outside_the_run_joins_it() {
    let mut core = core(TriggerWhileRunningBehaviour::Queue, false);

    let step = core.step(trigger("sass"));
    assert_eq!(dispatched(&step), vec!["sass"]);

    let step = core.step(trigger("scripts"));
    assert_eq!(dispatched(&step), vec!["scripts"]);
    assert!(core.queue_is_empty());
}

#[test]
fn trigger_for_running_task_is_queued_and_starts_after_the_run() {
    let mut core = core(TriggerWhileRunningBehaviour::Queue, false);

    core.step(trigger("sass"));
    let step = core.step(trigger("sass"));
    assert!(dispatched(&step).is_empty());
    assert_eq!(core.queued_len(), 1);

    let step = core.step(done("sass"));
    assert_eq!(dispatched(&step), vec!["sass"]);
    assert!(core.queue_is_empty());
    assert!(!core.is_idle());
}

#[test]
fn queued_triggers_run_once_each_in_order() {
    let mut core = core(TriggerWhileRunningBehaviour::Queue, false);

    core.step(trigger("sass"));
    core.step(trigger("sass"));
    core.step(trigger("sass"));
    assert_eq!(core.queued_len(), 2);

    assert_eq!(dispatched(&core.step(done("sass"))), vec!["sass"]);
    assert_eq!(core.queued_len(), 1);

    assert_eq!(dispatched(&core.step(done("sass"))), vec!["sass"]);
    assert!(core.queue_is_empty());

    assert!(dispatched(&core.step(done("sass"))).is_empty());
    assert!(core.is_idle());
}

#[test]
fn queued_run_pulls_in_following_triggers_for_other_tasks() {
    let mut core = core(TriggerWhileRunningBehaviour::Queue, false);

    core.step(RuntimeEvent::TaskTriggered {
        task: "build".to_string(),
        reason: TriggerReason::Manual,
    });
    core.step(trigger("sass"));
    core.step(trigger("scripts"));
    assert_eq!(core.queued_len(), 2);

    core.step(done("sass"));
    core.step(done("scripts"));
    let step = core.step(done("build"));

    assert_eq!(dispatched(&step), vec!["sass", "scripts"]);
    assert!(core.queue_is_empty());
}

#[test]
fn cancel_mode_keeps_only_the_latest_queued_trigger() {
    let mut core = core(TriggerWhileRunningBehaviour::Cancel, false);

    core.seed(vec!["sass".to_string(), "scripts".to_string()]);
    core.step(trigger("sass"));
    core.step(trigger("scripts"));
    assert_eq!(core.queued_len(), 1);

    core.step(done("sass"));
    let step = core.step(done("scripts"));
    assert_eq!(dispatched(&step), vec!["scripts"]);
}

#[test]
fn successful_task_with_reload_notifies_written_files() {
    let mut core = core(TriggerWhileRunningBehaviour::Queue, false);
    core.step(trigger("sass"));

    let css = PathBuf::from("/site/src/assets/css/main.css");
    let step = core.step(RuntimeEvent::TaskCompleted {
        task: "sass".to_string(),
        outcome: TaskOutcome::Success,
        written: vec![css.clone()],
    });

    let reloads: Vec<_> = step
        .commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::NotifyReload { kind, paths } => Some((*kind, paths.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(reloads, vec![(ReloadKind::Inject, vec![css])]);
    assert_eq!(core.report().written.len(), 1);
}

#[test]
fn task_without_reload_or_output_sends_no_notification() {
    let mut core = core(TriggerWhileRunningBehaviour::Queue, false);

    core.step(trigger("sass"));
    let step = core.step(done("sass"));
    assert!(
        !step
            .commands
            .iter()
            .any(|c| matches!(c, CoreCommand::NotifyReload { .. }))
    );

    core.step(trigger("scripts"));
    let step = core.step(RuntimeEvent::TaskCompleted {
        task: "scripts".to_string(),
        outcome: TaskOutcome::Success,
        written: vec![PathBuf::from("/site/build/app.js")],
    });
    assert!(
        !step
            .commands
            .iter()
            .any(|c| matches!(c, CoreCommand::NotifyReload { .. }))
    );
}

#[test]
fn failure_is_reported_and_later_triggers_wait_for_the_next_run() {
    let mut core = core(TriggerWhileRunningBehaviour::Queue, false);

    core.seed(vec!["sass".to_string(), "scripts".to_string()]);
    let step = core.step(RuntimeEvent::TaskCompleted {
        task: "sass".to_string(),
        outcome: TaskOutcome::Failed("Error: expected \";\"".to_string()),
        written: Vec::new(),
    });
    assert!(step.commands.iter().any(|c| matches!(
        c,
        CoreCommand::ReportFailure { task, message } if task == "sass" && message.contains("expected")
    )));

    // The run has failed: even a task outside it has to wait.
    let step = core.step(trigger("build"));
    assert!(dispatched(&step).is_empty());
    assert_eq!(core.queued_len(), 1);

    let step = core.step(done("scripts"));
    assert_eq!(dispatched(&step), vec!["sass", "scripts"]);
    assert_eq!(core.report().failed.len(), 0);
}

#[test]
fn reload_request_is_forwarded_as_is() {
    let mut core = core(TriggerWhileRunningBehaviour::Queue, false);
    let paths = vec![PathBuf::from("/site/src/index.html")];

    let step = core.step(RuntimeEvent::ReloadRequested {
        kind: ReloadKind::Full,
        paths: paths.clone(),
    });

    assert!(step.keep_running);
    assert!(matches!(
        step.commands.as_slice(),
        [CoreCommand::NotifyReload { kind: ReloadKind::Full, paths: p }] if *p == paths
    ));
}

#[test]
fn one_shot_core_requests_exit_once_idle() {
    let mut core = core(TriggerWhileRunningBehaviour::Queue, true);

    let step = core.seed(vec!["build".to_string()]);
    assert!(step.keep_running);
    assert_eq!(dispatched(&step), vec!["sass", "scripts"]);

    assert!(core.step(done("sass")).keep_running);
    let step = core.step(done("scripts"));
    assert_eq!(dispatched(&step), vec!["build"]);

    let step = core.step(done("build"));
    assert!(!step.keep_running);
    assert!(matches!(step.commands.last(), Some(CoreCommand::RequestExit)));

    let report = core.into_report();
    assert!(report.is_success());
    assert_eq!(report.succeeded.len(), 3);
}

#[test]
fn shutdown_stops_the_loop() {
    let mut core = core(TriggerWhileRunningBehaviour::Queue, false);
    assert!(!core.step(RuntimeEvent::ShutdownRequested).keep_running);
}

#[test]
fn shutdown_drains_running_tasks_and_skips_the_rest() {
    let mut core = core(TriggerWhileRunningBehaviour::Queue, false);

    let step = core.step(trigger("build"));
    assert_eq!(dispatched(&step), vec!["sass", "scripts"]);
    assert!(core.step(trigger("sass")).keep_running);
    assert_eq!(core.queued_len(), 1);

    let step = core.step(RuntimeEvent::ShutdownRequested);
    assert!(step.keep_running);
    assert!(core.is_shutting_down());
    assert!(core.queue_is_empty());
    assert_eq!(core.report().skipped, vec!["build".to_string()]);

    // New work is refused while draining.
    let step = core.step(trigger("scripts"));
    assert!(step.keep_running);
    assert!(dispatched(&step).is_empty());

    let step = core.step(done("sass"));
    assert!(step.keep_running);
    assert!(dispatched(&step).is_empty());
    assert!(matches!(
        step.commands.as_slice(),
        [] | [CoreCommand::NotifyReload { .. }]
    ));

    let step = core.step(done("scripts"));
    assert!(!step.keep_running);
    assert!(core.is_idle());

    let report = core.into_report();
    assert_eq!(report.succeeded, vec!["sass".to_string(), "scripts".to_string()]);
    assert_eq!(report.skipped, vec!["build".to_string()]);
}

#[test]
fn unknown_trigger_during_a_run_is_dropped_not_queued() {
    let mut core = core(TriggerWhileRunningBehaviour::Queue, false);
    core.step(trigger("build"));

    let step = core.step(trigger("no-such-task"));
    assert!(step.keep_running);
    assert!(step.commands.is_empty());
    assert!(core.queue_is_empty());

    // Every queued trigger names a registered task, so a queued run always
    // dispatches something when it starts.
    core.step(trigger("sass"));
    core.step(done("sass"));
    let step = core.step(done("scripts"));
    assert_eq!(dispatched(&step), vec!["build"]);
    let step = core.step(done("build"));
    assert_eq!(dispatched(&step), vec!["sass"]);
    assert!(!core.is_idle());
}
