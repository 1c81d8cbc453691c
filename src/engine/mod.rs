// src/engine/mod.rs

//! Orchestration engine for assetflow.
//!
//! This module ties together:
//! - the DAG scheduler
//! - the trigger queue (what happens when triggers arrive while a run is active)
//! - the main runtime event loop that reacts to:
//!   - explicit and file-watch triggers
//!   - task completion events
//!   - direct reload requests from watch rules
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`]. [`orchestrator`] runs a one-shot build on top
//! of both.

use std::path::PathBuf;

use crate::types::ReloadKind;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Outcome of a task for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Carries the error message (a transformer's diagnostic verbatim).
    Failed(String),
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Requested on the command line (or by a session's initial run).
    Manual,
    /// Triggered due to a filesystem event.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once the DAG is idle and there are no
    /// queued triggers (one-shot mode).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from watchers, executors, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A task should run (with its prerequisites).
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    /// A task finished. `written` lists the files it produced.
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
        written: Vec<PathBuf>,
    },
    /// A watch rule asked for a reload without running a task.
    ReloadRequested {
        kind: ReloadKind,
        paths: Vec<PathBuf>,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C or `Session::stop`).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod orchestrator;
pub mod queue;
pub mod report;
pub mod runtime;

pub use self::core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use orchestrator::run_once;
pub use queue::TriggerQueue;
pub use report::RunReport;
pub use runtime::{ReloadNotifier, Runtime};
pub use crate::types::TriggerWhileRunningBehaviour;
