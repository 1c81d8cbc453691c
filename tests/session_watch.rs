// tests/session_watch.rs

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use assetflow::config::ConfigFile;
use assetflow::engine::{RuntimeEvent, TriggerReason};
use assetflow::serve::ReloadEvent;
use assetflow::session::{Session, SessionOptions};
use assetflow::types::ReloadKind;
use assetflow_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use assetflow_test_utils::fake_executor::FakeExecutor;
use assetflow_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn project() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir_all(root.join("src/assets/scss")).unwrap();
    fs::create_dir_all(root.join("src/assets/css")).unwrap();
    fs::write(root.join("src/index.html"), "<body></body>").unwrap();
    (dir, root)
}

fn config() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_task(
            "sass",
            TaskConfigBuilder::group().reload(ReloadKind::Inject).build(),
        )
        .with_task("jshint", TaskConfigBuilder::group().build())
        .with_watch_rule(&["{source}/assets/scss/**/*.scss"], &["sass"])
        .with_reload_rule(&["{source}/**/*.html"], ReloadKind::Full)
        .with_debounce("50ms")
        .build()
}

async fn next_event(rx: &mut broadcast::Receiver<ReloadEvent>) -> ReloadEvent {
    with_timeout(rx.recv()).await.expect("hub closed")
}

async fn start(
    root: &Path,
    options: SessionOptions,
    executed: Arc<Mutex<Vec<String>>>,
) -> Result<Session, Box<dyn Error>> {
    let css = root.join("src/assets/css/main.css");
    let session = Session::start_with_executor(&config(), root, options, move |tx| {
        FakeExecutor::new(tx, executed).writes("sass", vec![css])
    })
    .await?;
    Ok(session)
}

#[tokio::test]
async fn style_change_runs_the_task_once_and_notifies_clients_once() -> TestResult {
    init_tracing();
    let (_dir, root) = project();
    let executed = Arc::new(Mutex::new(Vec::new()));

    let session = start(&root, SessionOptions::default(), executed.clone()).await?;
    assert!(session.server_addr().is_none());
    let mut rx = session.hub().subscribe();

    fs::write(root.join("src/assets/scss/main.scss"), "$c: red; a { color: $c; }")?;

    let event = next_event(&mut rx).await;
    assert_eq!(
        event,
        ReloadEvent::Reload {
            kind: ReloadKind::Inject,
            paths: vec!["/assets/css/main.css".to_string()],
        }
    );

    // Nothing else follows for the same change.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(executed.lock().unwrap().clone(), vec!["sass".to_string()]);

    with_timeout(session.stop()).await?;
    Ok(())
}

#[tokio::test]
async fn markup_change_reloads_without_running_tasks() -> TestResult {
    init_tracing();
    let (_dir, root) = project();
    let executed = Arc::new(Mutex::new(Vec::new()));

    let session = start(&root, SessionOptions::default(), executed.clone()).await?;
    let mut rx = session.hub().subscribe();

    fs::write(root.join("src/index.html"), "<body><p>changed</p></body>")?;

    let event = next_event(&mut rx).await;
    assert_eq!(
        event,
        ReloadEvent::Reload {
            kind: ReloadKind::Full,
            paths: vec!["/index.html".to_string()],
        }
    );
    assert!(executed.lock().unwrap().is_empty());

    with_timeout(session.stop()).await?;
    Ok(())
}

#[tokio::test]
async fn initial_targets_run_before_watching() -> TestResult {
    init_tracing();
    let (_dir, root) = project();
    let executed = Arc::new(Mutex::new(Vec::new()));

    let options = SessionOptions {
        initial_targets: vec!["sass".to_string(), "jshint".to_string()],
        ..SessionOptions::default()
    };
    let session = start(&root, options, executed.clone()).await?;

    let report = with_timeout(session.stop()).await?;
    let mut ran = executed.lock().unwrap().clone();
    ran.sort();
    assert_eq!(ran, vec!["jshint".to_string(), "sass".to_string()]);
    assert!(report.is_success());

    let mut succeeded = report.succeeded.clone();
    succeeded.sort();
    assert_eq!(succeeded, ran);
    Ok(())
}

#[tokio::test]
async fn preview_server_is_bound_when_serving() -> TestResult {
    init_tracing();
    let (_dir, root) = project();
    let executed = Arc::new(Mutex::new(Vec::new()));

    let options = SessionOptions {
        serve: true,
        port: Some(0),
        ..SessionOptions::default()
    };
    let session = start(&root, options, executed).await?;

    let addr = session.server_addr().ok_or("server not started")?;
    assert_ne!(addr.port(), 0);

    with_timeout(session.stop()).await?;
    Ok(())
}

#[tokio::test]
async fn style_change_with_server_notifies_once_and_keeps_the_server() -> TestResult {
    init_tracing();
    let (_dir, root) = project();
    let executed = Arc::new(Mutex::new(Vec::new()));

    let options = SessionOptions {
        serve: true,
        port: Some(0),
        ..SessionOptions::default()
    };
    let session = start(&root, options, executed.clone()).await?;
    let before = session.server_addr().ok_or("server not started")?;
    let mut rx = session.hub().subscribe();

    fs::write(root.join("src/assets/scss/theme.scss"), "a { color: blue; }")?;

    let event = next_event(&mut rx).await;
    assert_eq!(
        event,
        ReloadEvent::Reload {
            kind: ReloadKind::Inject,
            paths: vec!["/assets/css/main.css".to_string()],
        }
    );
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(executed.lock().unwrap().clone(), vec!["sass".to_string()]);

    assert_eq!(session.server_addr(), Some(before));
    let connect_to = std::net::SocketAddr::from(([127, 0, 0, 1], before.port()));
    with_timeout(TcpStream::connect(connect_to)).await?;

    with_timeout(session.stop()).await?;
    Ok(())
}

#[tokio::test]
async fn stop_waits_for_running_tasks_and_reports_them() -> TestResult {
    init_tracing();
    let (_dir, root) = project();
    fs::create_dir_all(root.join("src/in"))?;
    fs::write(root.join("src/in/a.txt"), "slow but sure")?;

    let cfg = ConfigFileBuilder::new()
        .with_transformer("slowcopy", "sleep 1; cat", None)
        .with_task(
            "slowcopy",
            TaskConfigBuilder::pipeline("src/in/*.txt", "out")
                .transform("slowcopy")
                .build(),
        )
        .with_task("later", TaskConfigBuilder::group().after("slowcopy").build())
        .build();

    let session = Session::start(&cfg, &root, SessionOptions::default()).await?;
    session
        .sender()
        .send(RuntimeEvent::TaskTriggered {
            task: "later".to_string(),
            reason: TriggerReason::Manual,
        })
        .await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let report = with_timeout(session.stop()).await?;

    assert_eq!(report.succeeded, vec!["slowcopy".to_string()]);
    assert_eq!(report.skipped, vec!["later".to_string()]);
    assert_eq!(fs::read_to_string(root.join("out/a.txt"))?, "slow but sure");
    Ok(())
}
