// src/watch/path_utils.rs

//! Project-relative paths with forward slashes, as matched by globs and
//! served as URLs.

use std::path::{Path, PathBuf};

/// Join the components of `path` with `/` regardless of platform.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// `path` relative to `root`, or `None` if it lies outside.
///
/// Watcher events may name the same directory through another prefix
/// (`/private/var` for `/var` on macOS), so a failed prefix match is retried
/// on canonical paths. A deleted file is resolved through its parent.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(slash_path(rel));
    }

    let root = root.canonicalize().ok()?;
    let path = canonical_lenient(path)?;
    path.strip_prefix(&root).ok().map(slash_path)
}

fn canonical_lenient(path: &Path) -> Option<PathBuf> {
    if let Ok(p) = path.canonicalize() {
        return Some(p);
    }
    let parent = path.parent()?.canonicalize().ok()?;
    Some(parent.join(path.file_name()?))
}
