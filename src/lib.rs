// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod pipeline;
pub mod serve;
pub mod session;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, default_config_path, load_and_validate, project_root_of};
use crate::dag::TaskAction;
use crate::engine::{TaskName, run_once};
use crate::errors::Result;
use crate::exec::{ExecContext, RealExecutorBackend};
use crate::pipeline::ContentCache;
use crate::session::{Session, SessionOptions};

/// Task run when no task is named on the command line.
pub const DEFAULT_TASK: &str = "default";

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and registry validation
/// - target resolution (`default` when none are given)
/// - a one-shot run, or a watch session when a `watch` task is requested
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let cfg = load_and_validate(&config_path)?;
    let project_root = canonical_root(&project_root_of(&config_path));

    let targets: Vec<TaskName> = if args.tasks.is_empty() {
        vec![DEFAULT_TASK.to_string()]
    } else {
        args.tasks.clone()
    };

    let plan = cfg.registry().plan(&targets)?;

    if args.dry_run {
        print_dry_run(&cfg, &targets, &plan)?;
        return Ok(());
    }

    if requires_session(&cfg, &plan)? {
        let options = SessionOptions {
            serve: !args.no_server,
            port: args.port,
            initial_targets: targets,
        };
        let session = Session::start(&cfg, &project_root, options).await?;
        session.run_until_ctrl_c().await?;
        return Ok(());
    }

    let cache = ContentCache::open(project_root.join(&cfg.paths.cache))?;
    let ctx = ExecContext::new(&project_root, cache);
    let report = run_once(cfg.registry(), &targets, move |tx| RealExecutorBackend::new(tx, ctx))
        .await?
        .into_result()?;

    info!(
        tasks = report.succeeded.len(),
        files = report.written.len(),
        "build finished"
    );
    Ok(())
}

/// Whether any task in the plan asks for a persistent session.
fn requires_session(cfg: &ConfigFile, plan: &[TaskName]) -> Result<bool> {
    for name in plan {
        if matches!(cfg.registry().lookup(name)?.action, TaskAction::Watch) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn canonical_root(root: &Path) -> PathBuf {
    root.canonicalize().unwrap_or_else(|_| root.to_path_buf())
}

/// Simple dry-run output: the tasks that would run, in dependency order.
fn print_dry_run(cfg: &ConfigFile, targets: &[TaskName], plan: &[TaskName]) -> Result<()> {
    println!("assetflow dry-run");
    println!(
        "  config.triggered_while_running_behaviour = {:?}",
        cfg.config.triggered_while_running_behaviour
    );
    println!("  config.queue_length = {}", cfg.config.queue_length);
    println!("  targets = {:?}", targets);
    println!();

    println!("plan ({} tasks):", plan.len());
    for (i, name) in plan.iter().enumerate() {
        let task = cfg.registry().lookup(name)?;
        println!("  {}. {} ({})", i + 1, name, task.action.kind_str());
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        match &task.action {
            TaskAction::Pipeline(spec) => {
                println!("      src: {:?}", spec.src);
                if let Some(dest) = &spec.dest {
                    println!("      dest: {}", dest);
                }
                for step in spec.steps.iter() {
                    println!("      step: {:?}", step);
                }
            }
            TaskAction::Clean { paths } => println!("      paths: {:?}", paths),
            TaskAction::Group | TaskAction::Watch => {}
        }
        if let Some(reload) = task.reload {
            println!("      reload: {:?}", reload);
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
