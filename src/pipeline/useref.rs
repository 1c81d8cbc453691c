// src/pipeline/useref.rs

//! Bundle the assets referenced inside HTML build blocks.
//!
//! ```html
//! <!-- build:css assets/css/main.min.css -->
//! <link rel="stylesheet" href="assets/css/base.css">
//! <link rel="stylesheet" href="assets/css/layout.css">
//! <!-- endbuild -->
//! ```
//!
//! becomes a single `<link>` to `assets/css/main.min.css`, and the
//! concatenation of both stylesheets is emitted as a new asset at that path.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::errors::{AssetflowError, Result};
use crate::pipeline::asset::Asset;

static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--\s*build:(css|js)\s+(\S+)\s*-->(.*?)<!--\s*endbuild\s*-->")
        .expect("valid build block regex")
});

static REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:href|src)\s*=\s*["']([^"']+)["']"#).expect("valid reference regex")
});

/// A build block found in an HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildBlock {
    pub kind: BlockKind,
    /// Path of the bundle, as written in the block header.
    pub target: String,
    /// Referenced files, in document order.
    pub refs: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Css,
    Js,
}

impl BlockKind {
    fn tag(self, target: &str) -> String {
        match self {
            BlockKind::Css => format!(r#"<link rel="stylesheet" href="{target}">"#),
            BlockKind::Js => format!(r#"<script src="{target}"></script>"#),
        }
    }
}

/// Every build block in `html`, in document order.
pub fn find_blocks(html: &str) -> Vec<BuildBlock> {
    BLOCK_RE
        .captures_iter(html)
        .map(|caps| BuildBlock {
            kind: if &caps[1] == "css" {
                BlockKind::Css
            } else {
                BlockKind::Js
            },
            target: caps[2].to_string(),
            refs: REF_RE
                .captures_iter(&caps[3])
                .map(|r| r[1].to_string())
                .collect(),
        })
        .collect()
}

/// Replace every build block in `html` with a single reference to its bundle.
pub fn rewrite_html(html: &str) -> String {
    BLOCK_RE
        .replace_all(html, |caps: &regex::Captures<'_>| {
            let kind = if &caps[1] == "css" {
                BlockKind::Css
            } else {
                BlockKind::Js
            };
            kind.tag(&caps[2])
        })
        .into_owned()
}

fn resolve_ref(search_dir: &Path, reference: &str) -> PathBuf {
    let clean = reference
        .split(['?', '#'])
        .next()
        .unwrap_or(reference)
        .trim_start_matches('/');
    search_dir.join(clean)
}

/// Rewrite HTML assets and append one bundle per distinct block target.
///
/// References are resolved against the directory of the HTML file on disk.
/// Non-HTML assets pass through untouched.
pub async fn bundle(assets: Vec<Asset>) -> Result<Vec<Asset>> {
    let mut out = Vec::with_capacity(assets.len());
    let mut bundles: BTreeMap<PathBuf, Asset> = BTreeMap::new();

    for asset in assets {
        if !asset.is_html() {
            out.push(asset);
            continue;
        }

        let html = String::from_utf8_lossy(&asset.contents).into_owned();
        let blocks = find_blocks(&html);
        if blocks.is_empty() {
            out.push(asset);
            continue;
        }

        let search_dir = asset
            .source
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let out_dir = asset.path.parent().map(Path::to_path_buf).unwrap_or_default();

        for block in blocks {
            let bundle_path = out_dir.join(block.target.trim_start_matches('/'));
            if bundles.contains_key(&bundle_path) {
                continue;
            }

            let mut contents = Vec::new();
            for reference in &block.refs {
                let file = resolve_ref(&search_dir, reference);
                let bytes = tokio::fs::read(&file)
                    .await
                    .map_err(|e| AssetflowError::fs(&file, e))?;
                if !contents.is_empty() {
                    contents.push(b'\n');
                }
                contents.extend_from_slice(&bytes);
            }

            debug!(
                html = %asset.path_str(),
                bundle = ?bundle_path,
                files = block.refs.len(),
                "bundled build block"
            );
            bundles.insert(bundle_path.clone(), Asset::new(bundle_path, contents));
        }

        let rewritten = rewrite_html(&html);
        out.push(Asset {
            contents: rewritten.into_bytes(),
            ..asset
        });
    }

    out.extend(bundles.into_values());
    Ok(out)
}
