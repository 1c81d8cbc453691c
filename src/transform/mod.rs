// src/transform/mod.rs

//! Transformers: the external tools pipelines delegate to.
//!
//! A transformer is an opaque function from input bytes to output bytes (or,
//! in check mode, pass/fail plus diagnostics). [`CommandTransformer`] wraps
//! an external command; [`CopyTransformer`] is the built-in identity.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::config::TransformerConfig;
use crate::errors::{AssetflowError, Result};
use crate::pipeline::Asset;

pub mod command;
pub mod copy;

pub use command::CommandTransformer;
pub use copy::CopyTransformer;

/// Name of the transformer that is always available.
pub const BUILTIN_COPY: &str = "copy";

/// Result of running a transformer in check mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintReport {
    pub passed: bool,
    /// The tool's own output, untouched.
    pub diagnostics: String,
}

pub trait Transformer: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Identifies the transformer's behaviour for cache keys: two
    /// transformers with equal fingerprints must produce equal output.
    fn fingerprint(&self) -> String;

    fn transform(&self, asset: Asset) -> BoxFuture<'_, Result<Asset>>;

    fn check<'a>(&'a self, asset: &'a Asset) -> BoxFuture<'a, Result<LintReport>>;
}

/// Named transformers available to pipeline steps.
#[derive(Debug, Clone, Default)]
pub struct TransformerSet {
    by_name: BTreeMap<String, Arc<dyn Transformer>>,
}

impl TransformerSet {
    /// The built-in transformers only.
    pub fn builtin() -> Self {
        let mut set = Self::default();
        set.insert(Arc::new(CopyTransformer));
        set
    }

    /// Built-ins plus one [`CommandTransformer`] per `[transformer.<name>]`,
    /// run with `project_root` as working directory.
    pub fn from_config(
        configs: &BTreeMap<String, TransformerConfig>,
        project_root: &Path,
    ) -> Result<Self> {
        let mut set = Self::builtin();

        for (name, cfg) in configs {
            if cfg.cmd.trim().is_empty() {
                return Err(AssetflowError::ConfigError(format!(
                    "transformer '{name}' has an empty cmd"
                )));
            }
            let transformer = CommandTransformer::new(name, &cfg.cmd, project_root)
                .with_extension(cfg.extension.clone());
            set.insert(Arc::new(transformer));
        }

        Ok(set)
    }

    /// Add or replace a transformer under its own name.
    pub fn insert(&mut self, transformer: Arc<dyn Transformer>) {
        self.by_name.insert(transformer.name().to_string(), transformer);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Transformer>> {
        self.by_name.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }
}
