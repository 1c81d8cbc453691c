// src/watch/patterns.rs

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::{PathsSection, WatchRuleConfig};
use crate::engine::TaskName;
use crate::types::ReloadKind;

/// Compiled `[[watch.rule]]`.
///
/// The patterns are relative to the project root; the watcher passes
/// relative paths (e.g. `"src/assets/scss/main.scss"`) into `matches`.
#[derive(Clone)]
pub struct WatchRuleProfile {
    patterns: Vec<String>,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
    tasks: Vec<TaskName>,
    reload: Option<ReloadKind>,
}

impl fmt::Debug for WatchRuleProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRuleProfile")
            .field("patterns", &self.patterns)
            .field("tasks", &self.tasks)
            .field("reload", &self.reload)
            .finish_non_exhaustive()
    }
}

impl WatchRuleProfile {
    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    pub fn reload(&self) -> Option<ReloadKind> {
        self.reload
    }

    /// Returns true if this rule is interested in the given path (relative
    /// to project root).
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Compile every watch rule, expanding `{source}` / `{build}`.
pub fn build_rule_profiles(
    rules: &[WatchRuleConfig],
    paths: &PathsSection,
) -> Result<Vec<WatchRuleProfile>> {
    let mut profiles = Vec::with_capacity(rules.len());

    for (i, rule) in rules.iter().enumerate() {
        let patterns: Vec<String> = rule.patterns.iter().map(|p| paths.expand(p)).collect();
        let excludes: Vec<String> = rule.exclude.iter().map(|p| paths.expand(p)).collect();

        let watch_set = build_globset(&patterns)
            .with_context(|| format!("building watch globset for rule #{}", i + 1))?;

        let exclude_set = if excludes.is_empty() {
            None
        } else {
            Some(
                build_globset(&excludes)
                    .with_context(|| format!("building exclude globset for rule #{}", i + 1))?,
            )
        };

        profiles.push(WatchRuleProfile {
            patterns,
            watch_set,
            exclude_set,
            tasks: rule.tasks.clone(),
            reload: rule.reload,
        });
    }

    Ok(profiles)
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// What one debounced window of changes asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchBatch {
    /// Each task at most once, in rule order.
    pub tasks: Vec<TaskName>,
    /// Reload-only rules: changed paths per reload kind.
    pub reloads: BTreeMap<ReloadKind, Vec<String>>,
}

impl WatchBatch {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.reloads.is_empty()
    }
}

/// Match changed paths against the rules.
pub fn plan_batch(profiles: &[WatchRuleProfile], rel_paths: &[String]) -> WatchBatch {
    let mut batch = WatchBatch::default();

    for profile in profiles {
        let matched: Vec<&String> = rel_paths.iter().filter(|p| profile.matches(p)).collect();
        if matched.is_empty() {
            continue;
        }

        for task in profile.tasks() {
            if !batch.tasks.contains(task) {
                batch.tasks.push(task.clone());
            }
        }

        if profile.tasks().is_empty() {
            if let Some(kind) = profile.reload() {
                let entry = batch.reloads.entry(kind).or_default();
                for path in matched {
                    if !entry.contains(path) {
                        entry.push(path.clone());
                    }
                }
            }
        }
    }

    batch
}
