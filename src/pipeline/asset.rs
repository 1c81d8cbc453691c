// src/pipeline/asset.rs

use std::path::PathBuf;

use crate::watch::path_utils::slash_path;

/// A file flowing through a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Path relative to the pipeline's base; also the output path under `dest`.
    pub path: PathBuf,
    /// Where the asset was read from, if it exists on disk.
    pub source: Option<PathBuf>,
    pub contents: Vec<u8>,
}

impl Asset {
    /// An asset that has no file on disk (e.g. a generated bundle).
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            source: None,
            contents: contents.into(),
        }
    }

    pub fn from_source(
        path: impl Into<PathBuf>,
        source: impl Into<PathBuf>,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            path: path.into(),
            source: Some(source.into()),
            contents: contents.into(),
        }
    }

    /// Lowercased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// `path` with forward slashes, as matched by `when` globs.
    pub fn path_str(&self) -> String {
        slash_path(&self.path)
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.path.set_extension(extension);
        self
    }

    pub fn is_html(&self) -> bool {
        matches!(self.extension().as_deref(), Some("html" | "htm"))
    }
}
