use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use assetflow::dag::ScheduledTask;
use assetflow::engine::{ReloadNotifier, RuntimeEvent, TaskOutcome};
use assetflow::errors::Result;
use assetflow::exec::ExecutorBackend;
use assetflow::types::ReloadKind;
use futures::future::{BoxFuture, FutureExt};
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which tasks were "run"
/// - immediately reports `TaskCompleted` for each scheduled task, failing the
///   tasks registered with [`FakeExecutor::fail`] and reporting the files
///   registered with [`FakeExecutor::writes`].
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failures: HashMap<String, String>,
    written: HashMap<String, Vec<PathBuf>>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            failures: HashMap::new(),
            written: HashMap::new(),
        }
    }

    /// Make `task` fail with `message`.
    pub fn fail(mut self, task: &str, message: &str) -> Self {
        self.failures.insert(task.to_string(), message.to_string());
        self
    }

    /// Report `paths` as written whenever `task` succeeds.
    pub fn writes(mut self, task: &str, paths: Vec<PathBuf>) -> Self {
        self.written.insert(task.to_string(), paths);
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn dispatch(&mut self, tasks: Vec<ScheduledTask>) -> BoxFuture<'_, Result<()>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);

        async move {
            for t in tasks {
                executed.lock().unwrap().push(t.name.clone());

                let (outcome, written) = match self.failures.get(&t.name) {
                    Some(message) => (TaskOutcome::Failed(message.clone()), Vec::new()),
                    None => (
                        TaskOutcome::Success,
                        self.written.get(&t.name).cloned().unwrap_or_default(),
                    ),
                };

                tx.send(RuntimeEvent::TaskCompleted {
                    task: t.name.clone(),
                    outcome,
                    written,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        }
        .boxed()
    }
}

/// One call received by a [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Reload { kind: ReloadKind, paths: Vec<PathBuf> },
    Failure { task: String, message: String },
}

/// A `ReloadNotifier` that remembers every call.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    calls: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Notification> {
        self.calls.lock().unwrap().clone()
    }
}

impl ReloadNotifier for RecordingNotifier {
    fn files_changed(&self, kind: ReloadKind, paths: &[PathBuf]) {
        self.calls.lock().unwrap().push(Notification::Reload {
            kind,
            paths: paths.to_vec(),
        });
    }

    fn task_failed(&self, task: &str, message: &str) {
        self.calls.lock().unwrap().push(Notification::Failure {
            task: task.to_string(),
            message: message.to_string(),
        });
    }
}
