// tests/build_pipeline.rs

use std::error::Error;
use std::fs;
use std::path::Path;

use tempfile::TempDir;
use walkdir::WalkDir;

use assetflow::config::load_and_validate;
use assetflow::engine::{RunReport, run_once};
use assetflow::errors::AssetflowError;
use assetflow::exec::{ExecContext, RealExecutorBackend};
use assetflow::pipeline::ContentCache;
use assetflow_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const CONFIG: &str = r#"
[paths]
source = "src"
build = "build"

[transformer.upper]
cmd = "tr a-z A-Z"

[transformer.broken]
cmd = "echo 'broken: cannot parse input' >&2; exit 2"

[task."clean:build"]
kind = "clean"
paths = ["{build}"]

[task."build:styles"]
src = ["{source}/assets/css/**/*.css"]
dest = "{build}/assets/css"
after = ["clean:build"]
steps = [{ step = "transform", transformer = "upper" }]

[task."build:scripts"]
src = ["{source}/assets/js/**/*.js"]
dest = "{build}/assets/js"
after = ["clean:build"]

[task."build:images"]
src = ["{source}/assets/images/**/*"]
dest = "{build}/assets/images"
after = ["clean:build"]
steps = [{ step = "transform", transformer = "copy" }]

[task."build:html"]
src = ["{source}/*.html"]
dest = "{build}"
after = ["clean:build"]
steps = [{ step = "useref" }]

[task."build:broken"]
src = ["{source}/assets/css/**/*.css"]
dest = "{build}/broken"
after = ["clean:build"]
steps = [{ step = "transform", transformer = "broken" }]

[task.build]
kind = "group"
after = ["build:styles", "build:scripts", "build:images", "build:html"]
"#;

const INDEX: &str = r#"<html>
<head>
<!-- build:css assets/css/site.min.css -->
<link rel="stylesheet" href="assets/css/base.css">
<link rel="stylesheet" href="assets/css/layout.css">
<!-- endbuild -->
</head>
<body></body>
</html>
"#;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "Assetflow.toml", CONFIG);
    write(root, "src/index.html", INDEX);
    write(root, "src/assets/css/base.css", "body { color: red; }");
    write(root, "src/assets/css/layout.css", "main { display: grid; }");
    write(root, "src/assets/js/app.js", "console.log('app');");
    write(root, "src/assets/js/vendor/lib.js", "var lib = 1;");
    write(root, "src/assets/images/logo.svg", "<svg></svg>");
    write(root, "build/stale.txt", "left over from an old build");
    dir
}

/// Every file under `dir`, relative and with forward slashes, sorted.
fn files_under(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let rel = e.path().strip_prefix(dir).ok()?;
            Some(rel.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    files.sort();
    files
}

async fn build(dir: &TempDir, targets: &[&str]) -> Result<RunReport, AssetflowError> {
    let cfg = load_and_validate(dir.path().join("Assetflow.toml"))?;
    let cache = ContentCache::open(dir.path().join(&cfg.paths.cache))?;
    let ctx = ExecContext::new(dir.path(), cache);
    let targets: Vec<String> = targets.iter().map(|t| t.to_string()).collect();

    with_timeout(run_once(cfg.registry(), &targets, move |tx| {
        RealExecutorBackend::new(tx, ctx)
    }))
    .await
}

#[tokio::test]
async fn full_build_writes_every_category_and_removes_stale_files() -> TestResult {
    init_tracing();
    let dir = project();
    let root = dir.path();

    let report = build(&dir, &["build"]).await?.into_result()?;
    assert_eq!(report.succeeded.len(), 6);

    assert!(!root.join("build/stale.txt").exists());
    assert_eq!(
        fs::read_to_string(root.join("build/assets/css/base.css"))?,
        "BODY { COLOR: RED; }"
    );
    assert_eq!(
        fs::read_to_string(root.join("build/assets/js/app.js"))?,
        "console.log('app');"
    );
    assert!(root.join("build/assets/js/vendor/lib.js").is_file());
    assert_eq!(
        fs::read_to_string(root.join("build/assets/images/logo.svg"))?,
        "<svg></svg>"
    );

    let html = fs::read_to_string(root.join("build/index.html"))?;
    assert!(html.contains(r#"<link rel="stylesheet" href="assets/css/site.min.css">"#));
    assert!(!html.contains("build:css"));
    assert_eq!(
        fs::read_to_string(root.join("build/assets/css/site.min.css"))?,
        "body { color: red; }\nmain { display: grid; }"
    );

    assert!(report.written.iter().all(|p| p.starts_with(root.join("build"))));

    assert_eq!(
        files_under(&root.join("build")),
        vec![
            "assets/css/base.css",
            "assets/css/layout.css",
            "assets/css/site.min.css",
            "assets/images/logo.svg",
            "assets/js/app.js",
            "assets/js/vendor/lib.js",
            "index.html",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn failing_transformer_does_not_stop_running_siblings() -> TestResult {
    init_tracing();
    let dir = project();
    let root = dir.path();

    let report = build(&dir, &["build:scripts", "build:broken"]).await?;

    assert_eq!(report.failed.len(), 1);
    assert!(root.join("build/assets/js/app.js").is_file());
    assert!(!root.join("build/broken").exists());

    match report.into_result() {
        Err(AssetflowError::TaskFailed { task, message }) => {
            assert_eq!(task, "build:broken");
            assert!(message.contains("broken: cannot parse input"), "{message}");
        }
        other => panic!("expected TaskFailed, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn pipeline_with_no_matching_files_succeeds() -> TestResult {
    init_tracing();
    let dir = project();
    fs::remove_dir_all(dir.path().join("src/assets/images"))?;

    let report = build(&dir, &["build:images"]).await?.into_result()?;
    assert!(report.written.is_empty());
    assert_eq!(report.succeeded.len(), 2);
    Ok(())
}
