// tests/scheduler.rs

use assetflow::config::ConfigFile;
use assetflow::dag::{Scheduler, TaskRunState};
use assetflow::engine::TaskOutcome;
use assetflow_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};

/// clean -> {styles, scripts} -> build
fn diamond() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_task("clean", TaskConfigBuilder::group().build())
        .with_task("styles", TaskConfigBuilder::group().after("clean").build())
        .with_task("scripts", TaskConfigBuilder::group().after("clean").build())
        .with_task(
            "build",
            TaskConfigBuilder::group().after("styles").after("scripts").build(),
        )
        .build()
}

fn names(tasks: Vec<assetflow::dag::ScheduledTask>) -> Vec<String> {
    let mut names: Vec<String> = tasks.into_iter().map(|t| t.name).collect();
    names.sort();
    names
}

#[test]
fn shared_prerequisite_runs_once_and_dependents_wait_for_it() {
    let cfg = diamond();
    let mut scheduler = Scheduler::from_registry(cfg.registry());
    scheduler.start_new_run();

    assert_eq!(names(scheduler.handle_trigger("styles")), vec!["clean"]);
    // Joining the run again does not schedule clean twice.
    assert!(scheduler.handle_trigger("scripts").is_empty());
    assert!(scheduler.handle_trigger("build").is_empty());
    assert_eq!(scheduler.deps_satisfied("build"), Some(false));

    let ready = scheduler.handle_completion("clean", &TaskOutcome::Success);
    assert_eq!(names(ready), vec!["scripts", "styles"]);

    assert!(scheduler.handle_completion("styles", &TaskOutcome::Success).is_empty());
    let ready = scheduler.handle_completion("scripts", &TaskOutcome::Success);
    assert_eq!(names(ready), vec!["build"]);

    scheduler.handle_completion("build", &TaskOutcome::Success);
    assert!(scheduler.is_idle());
}

#[test]
fn failure_skips_pending_tasks_but_lets_running_siblings_finish() {
    let cfg = diamond();
    let mut scheduler = Scheduler::from_registry(cfg.registry());
    scheduler.start_new_run();

    scheduler.handle_trigger("build");
    scheduler.handle_completion("clean", &TaskOutcome::Success);

    let step = scheduler.step_completion("styles", &TaskOutcome::Failed("sass: syntax".into()));
    assert!(step.newly_scheduled.is_empty());
    assert_eq!(step.newly_skipped, vec!["build".to_string()]);
    assert!(!step.run_just_finished);
    assert!(scheduler.current_run_failed());
    assert_eq!(scheduler.run_state_of("scripts"), Some(TaskRunState::Running));

    let step = scheduler.step_completion("scripts", &TaskOutcome::Success);
    assert!(step.newly_scheduled.is_empty());
    assert!(step.run_just_finished);
    assert!(scheduler.is_idle());
    assert_eq!(scheduler.run_state_of("build"), Some(TaskRunState::Skipped));
}

#[test]
fn trigger_into_a_failed_run_schedules_nothing() {
    let cfg = diamond();
    let mut scheduler = Scheduler::from_registry(cfg.registry());
    scheduler.start_new_run();

    scheduler.handle_trigger("styles");
    scheduler.handle_completion("clean", &TaskOutcome::Success);
    scheduler.handle_trigger("scripts");
    assert_eq!(scheduler.run_state_of("scripts"), Some(TaskRunState::Running));

    scheduler.handle_completion("styles", &TaskOutcome::Failed("boom".into()));
    let step = scheduler.step_trigger("build");
    assert!(step.newly_scheduled.is_empty());
    assert_eq!(step.newly_skipped, vec!["build".to_string()]);
}

#[test]
fn completion_for_task_not_running_is_ignored() {
    let cfg = diamond();
    let mut scheduler = Scheduler::from_registry(cfg.registry());
    scheduler.start_new_run();
    scheduler.handle_trigger("styles");

    let step = scheduler.step_completion("styles", &TaskOutcome::Success);
    assert!(step.newly_scheduled.is_empty());
    assert_eq!(scheduler.run_state_of("styles"), Some(TaskRunState::Pending));
}

#[test]
fn new_run_resets_per_run_state() {
    let cfg = diamond();
    let mut scheduler = Scheduler::from_registry(cfg.registry());
    scheduler.start_new_run();
    scheduler.handle_trigger("clean");
    scheduler.handle_completion("clean", &TaskOutcome::Success);
    assert!(scheduler.is_idle());
    let first = scheduler.current_run_id();

    scheduler.start_new_run();
    assert_ne!(scheduler.current_run_id(), first);
    assert_eq!(scheduler.run_state_of("clean"), Some(TaskRunState::NotInRun));
    assert!(scheduler.tasks_in_current_run().is_empty());
}
