// src/serve/events.rs

//! Fan-out of reload notifications to connected preview clients.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::engine::ReloadNotifier;
use crate::types::ReloadKind;
use crate::watch::path_utils::relative_str;

/// Message pushed to clients over the event stream, as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadEvent {
    /// Assets changed. `paths` are URL paths under the served root.
    Reload { kind: ReloadKind, paths: Vec<String> },
    /// A task failed in the watch session.
    Error { task: String, message: String },
}

/// Broadcasts [`ReloadEvent`]s to every subscribed client.
///
/// Sending never blocks; a client that falls behind by more than the channel
/// capacity misses the oldest events.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadEvent>,
    root: PathBuf,
}

impl ReloadHub {
    /// `root` is the served directory; changed files are reported relative
    /// to it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let (sender, _) = broadcast::channel(64);
        Self {
            sender,
            root: root.into(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.sender.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Send to every current subscriber; returns how many received it.
    pub fn send(&self, event: ReloadEvent) -> usize {
        match self.sender.send(event) {
            Ok(n) => n,
            Err(_) => {
                debug!("no preview clients connected; dropping reload event");
                0
            }
        }
    }

    /// URL path of `path` under the served root, if it lies inside it.
    pub fn url_path(&self, path: &Path) -> Option<String> {
        relative_str(&self.root, path).map(|rel| format!("/{rel}"))
    }
}

impl ReloadNotifier for ReloadHub {
    fn files_changed(&self, kind: ReloadKind, paths: &[PathBuf]) {
        let paths: Vec<String> = paths.iter().filter_map(|p| self.url_path(p)).collect();
        let clients = self.send(ReloadEvent::Reload { kind, paths });
        debug!(?kind, clients, "sent reload event");
    }

    fn task_failed(&self, task: &str, message: &str) {
        self.send(ReloadEvent::Error {
            task: task.to_string(),
            message: message.to_string(),
        });
    }
}
