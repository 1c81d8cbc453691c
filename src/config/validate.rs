// src/config/validate.rs

use std::path::Path;

use globset::{Glob, GlobMatcher};

use crate::config::model::{
    ConfigFile, PathsSection, RawConfigFile, StepConfig, TaskConfig, TaskKind,
};
use crate::dag::{Task, TaskAction, TaskRegistry};
use crate::errors::{AssetflowError, Result};
use crate::pipeline::{PipelineSpec, Step};
use crate::transform::TransformerSet;
use crate::watch::{build_rule_profiles, parse_duration};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::AssetflowError;

    /// Validate with the current directory as project root.
    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ConfigFile::from_raw(raw, Path::new("."))
    }
}

impl ConfigFile {
    /// Validate `raw` and compile its tasks into a registry.
    ///
    /// External transformers run with `project_root` as working directory.
    pub fn from_raw(raw: RawConfigFile, project_root: &Path) -> Result<Self> {
        ensure_has_tasks(&raw)?;
        validate_global_config(&raw)?;

        let transformers = TransformerSet::from_config(&raw.transformer, project_root)?;
        let registry = build_registry(&raw, &transformers)?;
        validate_watch_rules(&raw, &registry)?;

        Ok(ConfigFile::new_unchecked(
            raw.config, raw.paths, raw.server, raw.watch, registry,
        ))
    }
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(AssetflowError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    // triggered_while_running_behaviour is strongly typed and validated
    // during deserialization.

    if cfg.config.queue_length == 0 {
        return Err(AssetflowError::ConfigError(
            "[config].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }

    parse_duration(&cfg.watch.debounce).map_err(|e| {
        AssetflowError::ConfigError(format!("invalid [watch].debounce: {e}"))
    })?;

    Ok(())
}

/// Register every task, then check that all prerequisites exist.
fn build_registry(cfg: &RawConfigFile, transformers: &TransformerSet) -> Result<TaskRegistry> {
    let mut registry = TaskRegistry::new();

    for (name, task_cfg) in cfg.task.iter() {
        let task = compile_task(name, task_cfg, &cfg.paths, transformers)?;
        registry.register(task)?;
    }

    registry.validate()?;
    Ok(registry)
}

fn compile_task(
    name: &str,
    cfg: &TaskConfig,
    paths: &PathsSection,
    transformers: &TransformerSet,
) -> Result<Task> {
    let action = match cfg.kind {
        TaskKind::Pipeline => TaskAction::Pipeline(compile_pipeline(name, cfg, paths, transformers)?),
        TaskKind::Clean => {
            if cfg.paths.is_empty() {
                return Err(AssetflowError::ConfigError(format!(
                    "clean task '{name}' must list at least one entry in `paths`"
                )));
            }
            TaskAction::Clean {
                paths: cfg.paths.iter().map(|p| paths.expand(p)).collect(),
            }
        }
        TaskKind::Group => TaskAction::Group,
        TaskKind::Watch => TaskAction::Watch,
    };

    let mut task = Task::new(name, action);
    task.after = cfg.after.clone();
    task.reload = cfg.reload;
    Ok(task)
}

fn compile_pipeline(
    name: &str,
    cfg: &TaskConfig,
    paths: &PathsSection,
    transformers: &TransformerSet,
) -> Result<PipelineSpec> {
    if cfg.src.is_empty() {
        return Err(AssetflowError::ConfigError(format!(
            "pipeline task '{name}' must list at least one glob in `src`"
        )));
    }
    let check_only = cfg.steps.iter().all(|s| matches!(s, StepConfig::Lint { .. }));
    if cfg.dest.is_none() && (cfg.steps.is_empty() || !check_only) {
        return Err(AssetflowError::ConfigError(format!(
            "pipeline task '{name}' is missing `dest` (only lint-only pipelines may omit it)"
        )));
    }

    let lookup = |transformer: &str| {
        transformers.get(transformer).ok_or_else(|| {
            AssetflowError::ConfigError(format!(
                "task '{name}' uses unknown transformer '{transformer}'"
            ))
        })
    };
    let when = |glob: &Option<String>| -> Result<Option<GlobMatcher>> {
        glob.as_deref()
            .map(|g| {
                Glob::new(g).map(|g| g.compile_matcher()).map_err(|e| {
                    AssetflowError::ConfigError(format!(
                        "task '{name}' has invalid `when` glob '{g}': {e}"
                    ))
                })
            })
            .transpose()
    };

    let mut steps = Vec::with_capacity(cfg.steps.len());
    for step in cfg.steps.iter() {
        steps.push(match step {
            StepConfig::Transform {
                transformer,
                when: w,
            } => Step::Transform {
                transformer: lookup(transformer)?,
                when: when(w)?,
            },
            StepConfig::Lint {
                transformer,
                fail_on_error,
                when: w,
            } => Step::Lint {
                linter: lookup(transformer)?,
                fail_on_error: *fail_on_error,
                when: when(w)?,
            },
            StepConfig::Changed { extension } => Step::Changed {
                extension: extension.clone(),
            },
            StepConfig::Cache {
                transformer,
                when: w,
            } => Step::Cache {
                transformer: lookup(transformer)?,
                when: when(w)?,
            },
            StepConfig::Useref => Step::Useref,
        });
    }

    Ok(PipelineSpec {
        src: cfg.src.iter().map(|s| paths.expand(s)).collect(),
        base: cfg.base.as_deref().map(|b| paths.expand(b)),
        dest: cfg.dest.as_deref().map(|d| paths.expand(d)),
        steps,
    })
}

fn validate_watch_rules(cfg: &RawConfigFile, registry: &TaskRegistry) -> Result<()> {
    for (i, rule) in cfg.watch.rules.iter().enumerate() {
        if rule.patterns.is_empty() {
            return Err(AssetflowError::ConfigError(format!(
                "[[watch.rule]] #{} has no patterns",
                i + 1
            )));
        }
        if rule.tasks.is_empty() && rule.reload.is_none() {
            return Err(AssetflowError::ConfigError(format!(
                "[[watch.rule]] #{} must name tasks or a reload kind",
                i + 1
            )));
        }
        if !rule.tasks.is_empty() && rule.reload.is_some() {
            return Err(AssetflowError::ConfigError(format!(
                "[[watch.rule]] #{} names tasks and a reload kind; set `reload` on the tasks instead",
                i + 1
            )));
        }
        for task in rule.tasks.iter() {
            registry.lookup(task)?;
        }
    }

    build_rule_profiles(&cfg.watch.rules, &cfg.paths)
        .map_err(|e| AssetflowError::ConfigError(format!("{e:#}")))?;
    Ok(())
}
