// src/session.rs

//! Persistent watch session: preview server + file watcher + runtime.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::ConfigFile;
use crate::dag::Scheduler;
use crate::engine::{CoreRuntime, RunReport, Runtime, RuntimeEvent, RuntimeOptions, TaskName};
use crate::errors::{AssetflowError, Result};
use crate::exec::{ExecContext, ExecutorBackend, RealExecutorBackend};
use crate::pipeline::ContentCache;
use crate::serve::{PreviewServer, ReloadHub};
use crate::watch::{WatcherHandle, build_rule_profiles, parse_duration, spawn_watcher};

/// How a session is started.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Run the preview server (still subject to `[server].enabled`).
    pub serve: bool,
    /// Overrides `[server].port`.
    pub port: Option<u16>,
    /// Tasks run once right after startup.
    pub initial_targets: Vec<TaskName>,
}

/// A running watch session.
///
/// Created by [`Session::start`] and torn down by [`Session::stop`]; nothing
/// outlives it.
#[derive(Debug)]
pub struct Session {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    runtime: JoinHandle<Result<RunReport>>,
    watcher: Option<WatcherHandle>,
    server: Option<PreviewServer>,
    hub: ReloadHub,
}

impl Session {
    /// Start with the production executor.
    pub async fn start(
        cfg: &ConfigFile,
        project_root: &Path,
        options: SessionOptions,
    ) -> Result<Self> {
        let cache = ContentCache::open(project_root.join(&cfg.paths.cache))?;
        let ctx = ExecContext::new(project_root, cache);
        Self::start_with_executor(cfg, project_root, options, move |tx| {
            RealExecutorBackend::new(tx, ctx)
        })
        .await
    }

    /// Start with a custom executor backend.
    ///
    /// The preview server is bound first, so a taken port fails before any
    /// task runs or any file is watched.
    pub async fn start_with_executor<E, F>(
        cfg: &ConfigFile,
        project_root: &Path,
        options: SessionOptions,
        make_executor: F,
    ) -> Result<Self>
    where
        E: ExecutorBackend + 'static,
        F: FnOnce(mpsc::Sender<RuntimeEvent>) -> E,
    {
        let server_root = server_root(cfg, project_root);
        let hub = ReloadHub::new(&server_root);

        let server = if options.serve && cfg.server.enabled {
            let port = options.port.unwrap_or(cfg.server.port);
            Some(PreviewServer::start(&cfg.server.host, port, server_root, hub.clone()).await?)
        } else {
            None
        };

        let debounce = parse_duration(&cfg.watch.debounce).map_err(|e| {
            AssetflowError::ConfigError(format!("invalid [watch].debounce: {e}"))
        })?;
        let profiles = build_rule_profiles(&cfg.watch.rules, &cfg.paths)?;

        let (runtime_tx, runtime_rx) = mpsc::channel::<RuntimeEvent>(256);
        let executor = make_executor(runtime_tx.clone());

        let core = CoreRuntime::new(
            Scheduler::from_registry(cfg.registry()),
            cfg.config.triggered_while_running_behaviour,
            cfg.config.queue_length,
            RuntimeOptions {
                exit_when_idle: false,
            },
        );
        let runtime = Runtime::new(core, runtime_rx, executor)
            .with_notifier(Arc::new(hub.clone()))
            .with_seed(options.initial_targets);
        let runtime = tokio::spawn(runtime.run());

        let watcher = if profiles.is_empty() {
            warn!("no [[watch.rule]] entries; file changes will be ignored");
            None
        } else {
            Some(spawn_watcher(project_root, profiles, runtime_tx.clone(), debounce)?)
        };

        info!(
            server = ?server.as_ref().map(PreviewServer::local_addr),
            rules = cfg.watch.rules.len(),
            "watch session started"
        );

        Ok(Self {
            runtime_tx,
            runtime,
            watcher,
            server,
            hub,
        })
    }

    /// Where the preview server listens, if it runs.
    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(PreviewServer::local_addr)
    }

    pub fn hub(&self) -> &ReloadHub {
        &self.hub
    }

    /// Channel into the session's runtime (e.g. to trigger a task by hand).
    pub fn sender(&self) -> mpsc::Sender<RuntimeEvent> {
        self.runtime_tx.clone()
    }

    /// Stop watching, let running tasks finish, then stop the server.
    ///
    /// Queued triggers are dropped and tasks of the active run that have not
    /// started are skipped. Returns the report of the last run, including the
    /// tasks that finished while draining.
    pub async fn stop(mut self) -> Result<RunReport> {
        if let Some(watcher) = self.watcher.take() {
            watcher.stop();
        }

        // The runtime may already be gone; its result tells us either way.
        let _ = self.runtime_tx.send(RuntimeEvent::ShutdownRequested).await;
        let report = match self.runtime.await {
            Ok(res) => res?,
            Err(e) => {
                return Err(AssetflowError::Other(anyhow::anyhow!(
                    "session runtime panicked: {e}"
                )));
            }
        };

        if let Some(server) = self.server.take() {
            server.stop().await;
        }

        info!("watch session stopped");
        Ok(report)
    }

    /// Run until Ctrl-C, then stop.
    pub async fn run_until_ctrl_c(self) -> Result<RunReport> {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C; stopping session");
        } else {
            info!("Ctrl+C received; shutting down");
        }
        self.stop().await
    }
}

/// Directory served to preview clients.
fn server_root(cfg: &ConfigFile, project_root: &Path) -> PathBuf {
    let root = cfg.server.root.as_deref().unwrap_or(&cfg.paths.source);
    project_root.join(cfg.paths.expand(root))
}
