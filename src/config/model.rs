// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::dag::TaskRegistry;
use crate::types::{ReloadKind, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [paths]
/// source = "src"
/// build = "build"
///
/// [transformer.sass]
/// cmd = "sass --stdin"
/// extension = "css"
///
/// [task.sass]
/// kind = "pipeline"
/// src = ["{source}/assets/scss/**/*.scss"]
/// dest = "{source}/assets/css"
/// steps = [{ step = "transform", transformer = "sass" }]
/// reload = "inject"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub watch: WatchSection,

    /// External tools from `[transformer.<name>]`.
    #[serde(default)]
    pub transformer: BTreeMap<String, TransformerConfig>,

    /// All tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// Validated configuration.
///
/// Constructed via `TryFrom<RawConfigFile>`, which compiles every task into a
/// [`TaskRegistry`]. Registry errors (duplicates, cycles, unknown
/// prerequisites) surface there.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub paths: PathsSection,
    pub server: ServerSection,
    pub watch: WatchSection,
    registry: TaskRegistry,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        paths: PathsSection,
        server: ServerSection,
        watch: WatchSection,
        registry: TaskRegistry,
    ) -> Self {
        Self {
            config,
            paths,
            server,
            watch,
            registry,
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }
}

/// `[config]` section: overlap policy for watch-triggered runs.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued runs to remember while a run is active.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,
}

fn default_queue_length() -> usize {
    16
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
        }
    }
}

/// `[paths]` section: the fixed source/build layout.
///
/// Every path in task definitions may use `{source}` and `{build}`
/// placeholders; all paths are relative to the directory containing the
/// config file.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_source")]
    pub source: String,

    #[serde(default = "default_build")]
    pub build: String,

    /// Directory for the persistent content cache used by `cache` steps.
    #[serde(default = "default_cache")]
    pub cache: String,
}

fn default_source() -> String {
    "src".to_string()
}

fn default_build() -> String {
    "build".to_string()
}

fn default_cache() -> String {
    ".assetflow/cache".to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            source: default_source(),
            build: default_build(),
            cache: default_cache(),
        }
    }
}

impl PathsSection {
    /// Expand `{source}` / `{build}` placeholders.
    pub fn expand(&self, raw: &str) -> String {
        raw.replace("{source}", self.source.trim_end_matches('/'))
            .replace("{build}", self.build.trim_end_matches('/'))
    }
}

/// `[server]` section: the live-reload preview server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served to clients; defaults to `[paths].source`.
    #[serde(default)]
    pub root: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_port(),
            root: None,
        }
    }
}

/// `[watch]` section.
///
/// ```toml
/// [watch]
/// debounce = "100ms"
///
/// [[watch.rule]]
/// patterns = ["{source}/assets/scss/**/*.scss"]
/// tasks = ["sass"]
///
/// [[watch.rule]]
/// patterns = ["{source}/**/*.html"]
/// reload = "full"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Quiet period used to collapse bursts of filesystem events.
    #[serde(default = "default_debounce")]
    pub debounce: String,

    #[serde(default, rename = "rule")]
    pub rules: Vec<WatchRuleConfig>,
}

fn default_debounce() -> String {
    "100ms".to_string()
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce: default_debounce(),
            rules: Vec::new(),
        }
    }
}

/// One `[[watch.rule]]` entry.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WatchRuleConfig {
    pub patterns: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// Tasks to run when a matching file changes.
    #[serde(default)]
    pub tasks: Vec<String>,

    /// Reload signal sent straight to clients (no task involved).
    #[serde(default)]
    pub reload: Option<ReloadKind>,
}

/// `[transformer.<name>]`: an external tool invoked through the shell.
///
/// The file contents are written to the command's stdin and the transformed
/// contents are read back from its stdout.
#[derive(Debug, Clone, Deserialize)]
pub struct TransformerConfig {
    pub cmd: String,

    /// Replace the file extension of transformed outputs (e.g. `"css"`).
    #[serde(default)]
    pub extension: Option<String>,
}

/// What a task does when it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Read `src`, pass files through `steps`, write to `dest`.
    #[default]
    Pipeline,
    /// Delete `paths`.
    Clean,
    /// Nothing of its own; only orders its prerequisites.
    Group,
    /// Marks the run as persistent: preview server + file watching.
    Watch,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskConfig {
    #[serde(default)]
    pub kind: TaskKind,

    /// Input globs (pipeline).
    #[serde(default)]
    pub src: Vec<String>,

    /// Directory the glob paths are made relative to before being joined to
    /// `dest`. Defaults to the literal prefix of the first glob.
    #[serde(default)]
    pub base: Option<String>,

    /// Output directory (pipeline). Lint-only pipelines may omit it.
    #[serde(default)]
    pub dest: Option<String>,

    /// Ordered transformation steps (pipeline).
    #[serde(default)]
    pub steps: Vec<StepConfig>,

    /// Paths to delete (clean).
    #[serde(default)]
    pub paths: Vec<String>,

    /// Prerequisites: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// Notify preview clients when this task succeeds in a watch session.
    #[serde(default)]
    pub reload: Option<ReloadKind>,
}

/// One pipeline step, tagged by `step = "..."`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "step", rename_all = "lowercase")]
pub enum StepConfig {
    Transform {
        transformer: String,
        #[serde(default)]
        when: Option<String>,
    },
    Lint {
        transformer: String,
        #[serde(default)]
        fail_on_error: bool,
        #[serde(default)]
        when: Option<String>,
    },
    Changed {
        #[serde(default)]
        extension: Option<String>,
    },
    Cache {
        transformer: String,
        #[serde(default)]
        when: Option<String>,
    },
    Useref,
}
