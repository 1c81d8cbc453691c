// tests/runtime_fake_executor.rs

use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};

use assetflow::config::ConfigFile;
use assetflow::dag::Scheduler;
use assetflow::engine::{
    CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason,
    TriggerWhileRunningBehaviour, run_once,
};
use assetflow::errors::AssetflowError;
use assetflow::types::ReloadKind;
use assetflow_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use assetflow_test_utils::fake_executor::{FakeExecutor, Notification, RecordingNotifier};
use assetflow_test_utils::{eventually, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

/// clean -> {styles, scripts} -> build, plus an unrelated task.
fn build_config() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_task("clean", TaskConfigBuilder::group().build())
        .with_task(
            "styles",
            TaskConfigBuilder::group()
                .after("clean")
                .reload(ReloadKind::Inject)
                .build(),
        )
        .with_task("scripts", TaskConfigBuilder::group().after("clean").build())
        .with_task(
            "build",
            TaskConfigBuilder::group().after("styles").after("scripts").build(),
        )
        .with_task("images", TaskConfigBuilder::group().build())
        .build()
}

fn position(executed: &[String], name: &str) -> usize {
    executed
        .iter()
        .position(|t| t == name)
        .unwrap_or_else(|| panic!("{name} never executed: {executed:?}"))
}

#[tokio::test]
async fn one_shot_run_executes_closure_in_dependency_order() -> TestResult {
    init_tracing();

    let cfg = build_config();
    let executed = Arc::new(Mutex::new(Vec::new()));
    let exec = executed.clone();

    let report = with_timeout(run_once(cfg.registry(), &["build".to_string()], move |tx| {
        FakeExecutor::new(tx, exec)
    }))
    .await?;

    let executed = executed.lock().unwrap().clone();
    assert_eq!(executed.len(), 4, "each task runs exactly once: {executed:?}");
    assert!(!executed.contains(&"images".to_string()));
    assert!(position(&executed, "clean") < position(&executed, "styles"));
    assert!(position(&executed, "clean") < position(&executed, "scripts"));
    assert!(position(&executed, "styles") < position(&executed, "build"));
    assert!(position(&executed, "scripts") < position(&executed, "build"));

    assert!(report.is_success());
    assert_eq!(report.succeeded.len(), 4);
    Ok(())
}

#[tokio::test]
async fn several_targets_share_one_run() -> TestResult {
    init_tracing();

    let cfg = build_config();
    let executed = Arc::new(Mutex::new(Vec::new()));
    let exec = executed.clone();

    with_timeout(run_once(
        cfg.registry(),
        &["styles".to_string(), "scripts".to_string()],
        move |tx| FakeExecutor::new(tx, exec),
    ))
    .await?;

    let executed = executed.lock().unwrap().clone();
    assert_eq!(executed.iter().filter(|t| *t == "clean").count(), 1);
    assert_eq!(executed.len(), 3);
    Ok(())
}

#[tokio::test]
async fn failure_skips_dependents_and_surfaces_the_message() -> TestResult {
    init_tracing();

    let cfg = build_config();
    let executed = Arc::new(Mutex::new(Vec::new()));
    let exec = executed.clone();

    let report = with_timeout(run_once(cfg.registry(), &["build".to_string()], move |tx| {
        FakeExecutor::new(tx, exec).fail("styles", "Error: Undefined variable: \"$brand\".")
    }))
    .await?;

    let executed = executed.lock().unwrap().clone();
    assert!(!executed.contains(&"build".to_string()));
    assert!(executed.contains(&"scripts".to_string()));
    assert_eq!(report.skipped, vec!["build".to_string()]);

    match report.into_result() {
        Err(AssetflowError::TaskFailed { task, message }) => {
            assert_eq!(task, "styles");
            assert_eq!(message, "Error: Undefined variable: \"$brand\".");
        }
        other => panic!("expected TaskFailed, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn unknown_target_fails_before_anything_runs() -> TestResult {
    let cfg = build_config();
    let executed = Arc::new(Mutex::new(Vec::new()));
    let exec = executed.clone();

    let res = run_once(cfg.registry(), &["deploy".to_string()], move |tx| {
        FakeExecutor::new(tx, exec)
    })
    .await;

    assert!(matches!(res, Err(AssetflowError::UnknownTask(ref t)) if t == "deploy"));
    assert!(executed.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn persistent_runtime_forwards_reloads_and_failures() -> TestResult {
    init_tracing();

    let cfg = build_config();
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let css = PathBuf::from("/site/src/assets/css/main.css");
    let executor = FakeExecutor::new(rt_tx.clone(), executed.clone())
        .writes("styles", vec![css.clone()])
        .fail("images", "imagemin: unsupported file");

    let notifier = RecordingNotifier::new();
    let core = CoreRuntime::new(
        Scheduler::from_registry(cfg.registry()),
        TriggerWhileRunningBehaviour::Queue,
        16,
        RuntimeOptions {
            exit_when_idle: false,
        },
    );
    let runtime = Runtime::new(core, rt_rx, executor).with_notifier(Arc::new(notifier.clone()));
    let handle = tokio::spawn(runtime.run());

    rt_tx
        .send(RuntimeEvent::TaskTriggered {
            task: "styles".to_string(),
            reason: TriggerReason::FileWatch,
        })
        .await?;
    let inject = Notification::Reload {
        kind: ReloadKind::Inject,
        paths: vec![css],
    };
    wait_for(&notifier, &inject).await;

    rt_tx
        .send(RuntimeEvent::TaskTriggered {
            task: "images".to_string(),
            reason: TriggerReason::FileWatch,
        })
        .await?;
    let failure = Notification::Failure {
        task: "images".to_string(),
        message: "imagemin: unsupported file".to_string(),
    };
    wait_for(&notifier, &failure).await;

    rt_tx
        .send(RuntimeEvent::ReloadRequested {
            kind: ReloadKind::Full,
            paths: vec![PathBuf::from("/site/src/index.html")],
        })
        .await?;
    let full = Notification::Reload {
        kind: ReloadKind::Full,
        paths: vec![PathBuf::from("/site/src/index.html")],
    };
    wait_for(&notifier, &full).await;

    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;
    let report = timeout(Duration::from_secs(3), handle).await???;

    // The report describes the last run only.
    assert_eq!(report.failed.len(), 1);
    assert_eq!(notifier.calls(), vec![inject, failure, full]);
    Ok(())
}

async fn wait_for(notifier: &RecordingNotifier, expected: &Notification) {
    eventually(|| notifier.calls().contains(expected)).await;
}
