// src/pipeline/cache.rs

//! Persistent content-keyed cache for expensive transformers.
//!
//! Layout under the cache directory:
//!
//! - `index`: one `key extension` line per entry (`-` when the transformer
//!   kept the input extension), appended on each miss; later lines win
//! - `blobs/<key>`: the transformed bytes

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use blake3::Hasher;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::errors::{AssetflowError, Result};
use crate::pipeline::asset::Asset;
use crate::transform::Transformer;

const INDEX_FILE: &str = "index";
const BLOB_DIR: &str = "blobs";
const SAME_EXTENSION: &str = "-";

#[derive(Debug)]
pub struct ContentCache {
    dir: PathBuf,
    index: Mutex<BTreeMap<String, String>>,
    /// Serialises appends to the index file.
    index_file: tokio::sync::Mutex<()>,
}

impl ContentCache {
    /// Open (or lazily create) the cache at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let index = load_index(&dir.join(INDEX_FILE))?;
        debug!(dir = ?dir, entries = index.len(), "opened content cache");
        Ok(Self {
            dir,
            index: Mutex::new(index),
            index_file: tokio::sync::Mutex::new(()),
        })
    }

    pub fn len(&self) -> usize {
        self.index.lock().map(|i| i.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cache key for running `transformer` over `asset`.
    pub fn key(transformer: &dyn Transformer, asset: &Asset) -> String {
        let mut hasher = Hasher::new();
        hasher.update(transformer.fingerprint().as_bytes());
        hasher.update(&[0]);
        hasher.update(asset.extension().unwrap_or_default().as_bytes());
        hasher.update(&[0]);
        hasher.update(&asset.contents);
        hasher.finalize().to_hex().to_string()
    }

    /// Return the cached output for `asset`, running `transformer` on a miss.
    pub async fn get_or_transform(
        &self,
        transformer: &dyn Transformer,
        asset: Asset,
    ) -> Result<Asset> {
        let key = Self::key(transformer, &asset);

        if let Some(extension) = self.lookup(&key)? {
            let blob = self.blob_path(&key);
            match tokio::fs::read(&blob).await {
                Ok(contents) => {
                    debug!(path = %asset.path_str(), key = %key, "cache hit");
                    let mut hit = Asset {
                        contents,
                        ..asset
                    };
                    if extension != SAME_EXTENSION {
                        hit = hit.with_extension(&extension);
                    }
                    return Ok(hit);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "cache index entry without blob; recomputing");
                }
            }
        }

        let input_extension = asset.extension();
        let output = transformer.transform(asset).await?;

        let extension = match output.extension() {
            Some(ext) if Some(&ext) != input_extension.as_ref() => ext,
            _ => SAME_EXTENSION.to_string(),
        };
        self.store(&key, &extension, &output.contents).await?;
        debug!(path = %output.path_str(), key = %key, "cache miss; stored output");

        Ok(output)
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(BLOB_DIR).join(key)
    }

    fn lookup(&self, key: &str) -> Result<Option<String>> {
        let index = self.index.lock().map_err(|_| poisoned())?;
        Ok(index.get(key).cloned())
    }

    async fn store(&self, key: &str, extension: &str, contents: &[u8]) -> Result<()> {
        let blob = self.blob_path(key);
        if let Some(parent) = blob.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AssetflowError::fs(parent, e))?;
        }
        tokio::fs::write(&blob, contents)
            .await
            .map_err(|e| AssetflowError::fs(&blob, e))?;

        let previous = {
            let mut index = self.index.lock().map_err(|_| poisoned())?;
            index.insert(key.to_string(), extension.to_string())
        };
        if previous.as_deref() == Some(extension) {
            return Ok(());
        }

        self.append_index_line(key, extension).await
    }

    async fn append_index_line(&self, key: &str, extension: &str) -> Result<()> {
        let path = self.dir.join(INDEX_FILE);
        let _guard = self.index_file.lock().await;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| AssetflowError::fs(&path, e))?;
        file.write_all(format!("{key} {extension}\n").as_bytes())
            .await
            .map_err(|e| AssetflowError::fs(&path, e))?;
        file.flush().await.map_err(|e| AssetflowError::fs(&path, e))?;
        Ok(())
    }
}

fn poisoned() -> AssetflowError {
    AssetflowError::Other(anyhow::anyhow!("content cache index lock poisoned"))
}

fn load_index(path: &Path) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();

    if !path.exists() {
        return Ok(map);
    }

    let file = File::open(path).map_err(|e| AssetflowError::fs(path, e))?;
    let reader = BufReader::new(file);

    for line in reader.lines() {
        let line = line.map_err(|e| AssetflowError::fs(path, e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        // Format: "<key> <extension>"
        let mut parts = trimmed.splitn(2, ' ');
        let key = parts.next().unwrap_or("").trim();
        let extension = parts.next().unwrap_or("").trim();

        if !key.is_empty() && !extension.is_empty() {
            map.insert(key.to_string(), extension.to_string());
        }
    }

    Ok(map)
}
