// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling `[[watch.rule]]` glob patterns.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Debouncing bursts of changes into one batch per quiet period.
//!
//! It does **not** know about the DAG; it only turns filesystem changes into
//! task triggers and reload requests.

pub mod debounce;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use debounce::{Debouncer, parse_duration};
pub use patterns::{WatchBatch, WatchRuleProfile, build_rule_profiles, plan_batch};
pub use watcher::{WatcherHandle, spawn_watcher};
