// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::watch::debounce::Debouncer;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{WatchRuleProfile, plan_batch};

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

impl WatcherHandle {
    /// Stop watching and abort the forwarding task.
    pub fn stop(self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher that observes `root` recursively.
///
/// Changes are debounced by `debounce`; when a window closes, the watcher
/// sends one `RuntimeEvent::TaskTriggered` per task bound to a matching rule
/// and one `RuntimeEvent::ReloadRequested` per reload kind of matching
/// reload-only rules.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    profiles: Vec<WatchRuleProfile>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    debounce: Duration,
) -> Result<WatcherHandle> {
    let root = root.into();
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    let profiles = Arc::new(profiles);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // We can't log via tracing here easily, so fallback to stderr.
                    eprintln!("assetflow: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("assetflow: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    let task = tokio::spawn(async move {
        let mut debouncer = Debouncer::new(debounce);

        loop {
            let event = match debouncer.deadline() {
                Some(deadline) => {
                    let sleep = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline));
                    tokio::select! {
                        event = event_rx.recv() => event,
                        _ = sleep => {
                            if !flush(&mut debouncer, &profiles, &root, &runtime_tx).await {
                                break;
                            }
                            continue;
                        }
                    }
                }
                None => event_rx.recv().await,
            };

            let Some(event) = event else {
                break;
            };

            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }

            debug!(?event, "received notify event");
            for path in event.paths {
                if let Some(rel) = relative_str(&root, &path) {
                    debouncer.push(rel, Instant::now());
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        task,
    })
}

/// Forward a due batch to the runtime. Returns `false` once the runtime is gone.
async fn flush(
    debouncer: &mut Debouncer,
    profiles: &[WatchRuleProfile],
    root: &std::path::Path,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    let Some(paths) = debouncer.take_if_due(Instant::now()) else {
        return true;
    };

    let batch = plan_batch(profiles, &paths);
    if batch.is_empty() {
        debug!(?paths, "changes matched no watch rule");
        return true;
    }

    info!(changed = paths.len(), tasks = ?batch.tasks, "file changes detected");

    for task in batch.tasks {
        let event = RuntimeEvent::TaskTriggered {
            task,
            reason: TriggerReason::FileWatch,
        };
        if runtime_tx.send(event).await.is_err() {
            warn!("runtime channel closed; stopping watcher");
            return false;
        }
    }

    for (kind, rel_paths) in batch.reloads {
        let event = RuntimeEvent::ReloadRequested {
            kind,
            paths: rel_paths.iter().map(|p| root.join(p)).collect(),
        };
        if runtime_tx.send(event).await.is_err() {
            warn!("runtime channel closed; stopping watcher");
            return false;
        }
    }

    true
}
