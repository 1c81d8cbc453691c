// src/watch/debounce.rs

//! Collapse bursts of filesystem events into one batch.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// Parse a duration string like `"100ms"`, `"3s"`, `"1m"` or `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}

/// Trailing-edge debouncer over changed paths.
///
/// Every new path pushes the deadline to `now + window`; the batch is
/// released once no path has arrived for a whole window.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: BTreeSet<String>,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: BTreeSet::new(),
            deadline: None,
        }
    }

    pub fn push(&mut self, rel_path: impl Into<String>, now: Instant) {
        self.pending.insert(rel_path.into());
        self.deadline = Some(now + self.window);
    }

    /// When the current batch is due, if there is one.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Release the batch (sorted, deduplicated) if its deadline has passed.
    pub fn take_if_due(&mut self, now: Instant) -> Option<Vec<String>> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                Some(std::mem::take(&mut self.pending).into_iter().collect())
            }
            _ => None,
        }
    }
}
