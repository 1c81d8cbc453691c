// src/pipeline/mod.rs

//! File pipelines: read a file set, pass it through ordered steps and write
//! the results.
//!
//! - [`fileset`] resolves `src` globs to files on disk.
//! - [`changed`] drops files whose output is already up to date.
//! - [`cache`] persists transformer output keyed by content.
//! - [`useref`] bundles the files referenced by HTML build blocks.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use globset::GlobMatcher;
use tracing::{debug, info, warn};

use crate::errors::{AssetflowError, Result};
use crate::transform::Transformer;

pub mod asset;
pub mod cache;
pub mod changed;
pub mod fileset;
pub mod useref;

pub use asset::Asset;
pub use cache::ContentCache;

/// One step of a pipeline.
#[derive(Clone)]
pub enum Step {
    /// Run every (matching) file through a transformer.
    Transform {
        transformer: Arc<dyn Transformer>,
        when: Option<GlobMatcher>,
    },
    /// Check every (matching) file; report diagnostics.
    Lint {
        linter: Arc<dyn Transformer>,
        fail_on_error: bool,
        when: Option<GlobMatcher>,
    },
    /// Keep only files whose output is missing or stale.
    Changed { extension: Option<String> },
    /// Like `Transform`, but outputs are cached by content.
    Cache {
        transformer: Arc<dyn Transformer>,
        when: Option<GlobMatcher>,
    },
    /// Bundle HTML build blocks.
    Useref,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Transform { transformer, when } => f
                .debug_struct("Transform")
                .field("transformer", &transformer.name())
                .field("when", &when.as_ref().map(|m| m.glob().glob()))
                .finish(),
            Step::Lint {
                linter,
                fail_on_error,
                when,
            } => f
                .debug_struct("Lint")
                .field("linter", &linter.name())
                .field("fail_on_error", fail_on_error)
                .field("when", &when.as_ref().map(|m| m.glob().glob()))
                .finish(),
            Step::Changed { extension } => f
                .debug_struct("Changed")
                .field("extension", extension)
                .finish(),
            Step::Cache { transformer, when } => f
                .debug_struct("Cache")
                .field("transformer", &transformer.name())
                .field("when", &when.as_ref().map(|m| m.glob().glob()))
                .finish(),
            Step::Useref => f.write_str("Useref"),
        }
    }
}

/// Declarative file pipeline: globs in, steps, one destination directory.
///
/// All paths are relative to the project root. A pipeline without `dest`
/// only checks its files (lint steps) and writes nothing.
#[derive(Debug, Clone)]
pub struct PipelineSpec {
    pub src: Vec<String>,
    pub base: Option<String>,
    pub dest: Option<String>,
    pub steps: Vec<Step>,
}

impl PipelineSpec {
    pub fn new(src: Vec<String>, dest: impl Into<String>) -> Self {
        Self {
            src,
            base: None,
            dest: Some(dest.into()),
            steps: Vec::new(),
        }
    }

    /// A pipeline that writes nothing.
    pub fn check_only(src: Vec<String>) -> Self {
        Self {
            src,
            base: None,
            dest: None,
            steps: Vec::new(),
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }
}

/// Upper bound on files transformed at the same time within one step.
///
/// Each transformed file may spawn an external process.
pub fn max_parallel_files() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .clamp(2, 16)
}

fn applies(when: &Option<GlobMatcher>, asset: &Asset) -> bool {
    match when {
        Some(matcher) => matcher.is_match(asset.path_str()),
        None => true,
    }
}

/// Run a pipeline rooted at `root`. Returns the files written.
pub async fn run(
    task: &str,
    spec: &PipelineSpec,
    root: &Path,
    cache: &ContentCache,
) -> Result<Vec<PathBuf>> {
    let mut assets = fileset::resolve(root, &spec.src, spec.base.as_deref()).await?;
    let dest = spec.dest.as_ref().map(|d| root.join(d));

    for step in &spec.steps {
        debug!(task = %task, ?step, files = assets.len(), "applying step");
        assets = match step {
            Step::Transform { transformer, when } => {
                stream::iter(assets)
                    .map(|asset| async move {
                        if applies(when, &asset) {
                            transformer.transform(asset).await
                        } else {
                            Ok(asset)
                        }
                    })
                    .buffered(max_parallel_files())
                    .try_collect::<Vec<_>>()
                    .await?
            }
            Step::Cache { transformer, when } => {
                stream::iter(assets)
                    .map(|asset| async move {
                        if applies(when, &asset) {
                            cache.get_or_transform(transformer.as_ref(), asset).await
                        } else {
                            Ok(asset)
                        }
                    })
                    .buffered(max_parallel_files())
                    .try_collect::<Vec<_>>()
                    .await?
            }
            Step::Lint {
                linter,
                fail_on_error,
                when,
            } => {
                lint(task, linter.as_ref(), *fail_on_error, when, &assets).await?;
                assets
            }
            Step::Changed { extension } => match &dest {
                Some(dest) => changed::retain_changed(assets, dest, extension.as_deref()).await,
                None => assets,
            },
            Step::Useref => useref::bundle(assets).await?,
        };
    }

    let Some(dest) = dest else {
        info!(task = %task, files = assets.len(), "pipeline checked files");
        return Ok(Vec::new());
    };

    let mut written = Vec::with_capacity(assets.len());
    for asset in assets {
        let out = dest.join(&asset.path);
        if let Some(parent) = out.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AssetflowError::fs(parent, e))?;
        }
        tokio::fs::write(&out, &asset.contents)
            .await
            .map_err(|e| AssetflowError::fs(&out, e))?;
        written.push(out);
    }

    info!(task = %task, files = written.len(), dest = ?dest, "pipeline wrote files");
    Ok(written)
}

async fn lint(
    task: &str,
    linter: &dyn Transformer,
    fail_on_error: bool,
    when: &Option<GlobMatcher>,
    assets: &[Asset],
) -> Result<()> {
    let mut first_failure: Option<AssetflowError> = None;
    let mut problems = 0usize;

    for asset in assets.iter().filter(|a| applies(when, a)) {
        let report = linter.check(asset).await?;
        if report.passed {
            continue;
        }

        problems += 1;
        warn!(
            task = %task,
            linter = %linter.name(),
            path = %asset.path_str(),
            "lint problems:\n{}",
            report.diagnostics.trim_end()
        );

        if fail_on_error && first_failure.is_none() {
            first_failure = Some(AssetflowError::Transformer {
                transformer: linter.name().to_string(),
                path: asset.path.clone(),
                message: report.diagnostics,
            });
        }
    }

    if problems > 0 {
        info!(task = %task, linter = %linter.name(), files = problems, "lint reported problems");
    }

    match first_failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
