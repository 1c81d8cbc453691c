// src/engine/queue.rs

use std::collections::VecDeque;

use tracing::{debug, warn};

use super::TaskName;
use crate::types::TriggerWhileRunningBehaviour;

/// Triggers that arrived for tasks already taking part in the active run.
///
/// Semantics:
/// - `Queue`: every trigger is kept as its own future run, in arrival order.
///   Two saves of the same stylesheet while `sass` is running produce two
///   further runs of `sass`, one after the other.
/// - `Cancel`: only the most recent trigger is kept.
/// - `max_runs` bounds the queue; past it the oldest entries are dropped.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    runs: VecDeque<TaskName>,
}

impl TriggerQueue {
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    /// Record a trigger that has to wait for the active run.
    pub fn record_trigger(&mut self, task: &str) {
        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                self.runs.push_back(task.to_string());
                debug!(task = %task, queued = self.runs.len(), "queued trigger behind active run");

                if self.runs.len() > self.max_runs {
                    warn!(
                        queued = self.runs.len(),
                        max_runs = self.max_runs,
                        "exceeded queue_length; dropping oldest queued triggers"
                    );
                    while self.runs.len() > self.max_runs {
                        self.runs.pop_front();
                    }
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                debug!(task = %task, "resetting queued triggers to this task only (cancel mode)");
                self.runs.clear();
                self.runs.push_back(task.to_string());
            }
        }
    }

    /// The oldest waiting trigger, if any.
    pub fn front(&self) -> Option<&TaskName> {
        self.runs.front()
    }

    /// Remove and return the oldest waiting trigger.
    pub fn pop_front(&mut self) -> Option<TaskName> {
        self.runs.pop_front()
    }

    /// Drop every waiting trigger; returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.runs.len();
        self.runs.clear();
        dropped
    }
}
