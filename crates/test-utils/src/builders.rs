#![allow(dead_code)]

use assetflow::config::{
    ConfigFile, RawConfigFile, StepConfig, TaskConfig, TaskKind, TransformerConfig,
    WatchRuleConfig,
};
use assetflow::types::{ReloadKind, TriggerWhileRunningBehaviour};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_transformer(mut self, name: &str, cmd: &str, extension: Option<&str>) -> Self {
        self.config.transformer.insert(
            name.to_string(),
            TransformerConfig {
                cmd: cmd.to_string(),
                extension: extension.map(str::to_string),
            },
        );
        self
    }

    pub fn with_watch_rule(mut self, patterns: &[&str], tasks: &[&str]) -> Self {
        self.config.watch.rules.push(WatchRuleConfig {
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
            ..WatchRuleConfig::default()
        });
        self
    }

    pub fn with_reload_rule(mut self, patterns: &[&str], kind: ReloadKind) -> Self {
        self.config.watch.rules.push(WatchRuleConfig {
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            reload: Some(kind),
            ..WatchRuleConfig::default()
        });
        self
    }

    pub fn with_debounce(mut self, debounce: &str) -> Self {
        self.config.watch.debounce = debounce.to_string();
        self
    }

    pub fn with_behaviour(mut self, behaviour: TriggerWhileRunningBehaviour) -> Self {
        self.config.config.triggered_while_running_behaviour = behaviour;
        self
    }

    pub fn with_queue_length(mut self, len: usize) -> Self {
        self.config.config.queue_length = len;
        self
    }

    pub fn with_paths(mut self, source: &str, build: &str) -> Self {
        self.config.paths.source = source.to_string();
        self.config.paths.build = build.to_string();
        self
    }

    pub fn without_server(mut self) -> Self {
        self.config.server.enabled = false;
        self
    }

    /// The raw config, for tests that exercise validation errors.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    /// A task with no work of its own.
    pub fn group() -> Self {
        Self {
            task: TaskConfig {
                kind: TaskKind::Group,
                ..TaskConfig::default()
            },
        }
    }

    pub fn pipeline(src: &str, dest: &str) -> Self {
        Self {
            task: TaskConfig {
                kind: TaskKind::Pipeline,
                src: vec![src.to_string()],
                dest: Some(dest.to_string()),
                ..TaskConfig::default()
            },
        }
    }

    pub fn clean(path: &str) -> Self {
        Self {
            task: TaskConfig {
                kind: TaskKind::Clean,
                paths: vec![path.to_string()],
                ..TaskConfig::default()
            },
        }
    }

    pub fn watch() -> Self {
        Self {
            task: TaskConfig {
                kind: TaskKind::Watch,
                ..TaskConfig::default()
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn src(mut self, pattern: &str) -> Self {
        self.task.src.push(pattern.to_string());
        self
    }

    pub fn base(mut self, base: &str) -> Self {
        self.task.base = Some(base.to_string());
        self
    }

    pub fn transform(mut self, transformer: &str) -> Self {
        self.task.steps.push(StepConfig::Transform {
            transformer: transformer.to_string(),
            when: None,
        });
        self
    }

    pub fn step(mut self, step: StepConfig) -> Self {
        self.task.steps.push(step);
        self
    }

    pub fn reload(mut self, kind: ReloadKind) -> Self {
        self.task.reload = Some(kind);
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
