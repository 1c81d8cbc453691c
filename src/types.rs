use serde::{Deserialize, Serialize};

/// Behaviour when a watch trigger arrives for a task that is already part of
/// the active run.
///
/// - `Queue`: run it again after the current run finishes, once per trigger,
///   in arrival order (default behaviour).
/// - `Cancel`: forget any previously queued runs and only keep the latest
///   trigger. The running tasks themselves are never interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}

/// How preview clients should react to a changed asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadKind {
    /// Swap matching stylesheets in place, no page reload.
    Inject,
    /// Reload the whole page.
    Full,
}
