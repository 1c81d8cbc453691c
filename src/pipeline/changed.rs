// src/pipeline/changed.rs

//! Drop files whose output is already up to date.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::pipeline::asset::Asset;

/// Where `asset` would be written under `dest_dir`, with the extension
/// replaced when one is given.
pub fn output_path(asset: &Asset, dest_dir: &Path, extension: Option<&str>) -> PathBuf {
    let mut out = dest_dir.join(&asset.path);
    if let Some(ext) = extension {
        out.set_extension(ext);
    }
    out
}

async fn modified(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}

/// Keep assets whose output is missing or older than the source.
///
/// Assets without a source file, or whose timestamps cannot be read, are
/// always kept.
pub async fn retain_changed(
    assets: Vec<Asset>,
    dest_dir: &Path,
    extension: Option<&str>,
) -> Vec<Asset> {
    let total = assets.len();
    let mut kept = Vec::with_capacity(total);

    for asset in assets {
        let Some(source) = asset.source.as_deref() else {
            kept.push(asset);
            continue;
        };

        let out = output_path(&asset, dest_dir, extension);
        let fresh = match (modified(source).await, modified(&out).await) {
            (Some(src), Some(dst)) => dst >= src,
            _ => false,
        };

        if fresh {
            debug!(path = %asset.path_str(), "output up to date; skipping");
        } else {
            kept.push(asset);
        }
    }

    debug!(total, kept = kept.len(), "changed filter applied");
    kept
}
