// src/pipeline/fileset.rs

//! Resolve `src` glob lists against the filesystem.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;
use walkdir::WalkDir;

use crate::errors::{AssetflowError, Result};
use crate::pipeline::asset::Asset;
use crate::watch::path_utils::slash_path;

/// The literal directory prefix of a glob, e.g. `src/assets/scss` for
/// `src/assets/scss/**/*.scss`.
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    let components: Vec<&str> = pattern.split('/').collect();
    let last = components.len().saturating_sub(1);

    for (i, part) in components.into_iter().enumerate() {
        if i == last || part.contains(['*', '?', '[', '{']) {
            break;
        }
        if !part.is_empty() && part != "." {
            base.push(part);
        }
    }
    base
}

fn compile(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| AssetflowError::ConfigError(format!("invalid glob '{pattern}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| AssetflowError::ConfigError(format!("building globset: {e}")))
}

/// Files matched by `patterns` (relative to `root`), as
/// `(absolute path, path relative to its base)` pairs, ordered by path.
///
/// Patterns starting with `!` exclude. Without an explicit `base`, each
/// pattern's own literal prefix is the base. Directories that do not exist
/// yield nothing.
pub fn matching_files(
    root: &Path,
    patterns: &[String],
    base: Option<&str>,
) -> Result<Vec<(PathBuf, PathBuf)>> {
    let excludes: Vec<&str> = patterns
        .iter()
        .filter_map(|p| p.strip_prefix('!'))
        .collect();
    let exclude_set = compile(&excludes)?;

    let mut found: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();

    for pattern in patterns.iter().filter(|p| !p.starts_with('!')) {
        let include = compile(&[pattern.as_str()])?;
        let pattern_base = glob_base(pattern);
        let rel_base = match base {
            Some(b) => PathBuf::from(b),
            None => pattern_base.clone(),
        };

        let walk_root = root.join(&pattern_base);
        if !walk_root.exists() {
            debug!(pattern = %pattern, dir = ?walk_root, "glob base does not exist; no files");
            continue;
        }

        for entry in WalkDir::new(&walk_root).follow_links(true) {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| walk_root.clone());
                AssetflowError::fs(path, std::io::Error::other(e.to_string()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let abs = entry.path().to_path_buf();
            let Ok(rel_root) = abs.strip_prefix(root) else {
                continue;
            };
            let rel_root = slash_path(rel_root);

            if !include.is_match(&rel_root) || exclude_set.is_match(&rel_root) {
                continue;
            }

            let rel = abs
                .strip_prefix(root.join(&rel_base))
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| PathBuf::from(&rel_root));
            found.entry(abs).or_insert(rel);
        }
    }

    Ok(found.into_iter().collect())
}

/// Read every matching file into an [`Asset`].
pub async fn resolve(root: &Path, patterns: &[String], base: Option<&str>) -> Result<Vec<Asset>> {
    let files = matching_files(root, patterns, base)?;
    let mut assets = Vec::with_capacity(files.len());

    for (abs, rel) in files {
        let contents = tokio::fs::read(&abs)
            .await
            .map_err(|e| AssetflowError::fs(&abs, e))?;
        assets.push(Asset::from_source(rel, abs, contents));
    }

    debug!(count = assets.len(), ?patterns, "resolved file set");
    Ok(assets)
}
