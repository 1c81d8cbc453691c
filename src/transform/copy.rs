// src/transform/copy.rs

use futures::future::{BoxFuture, FutureExt};

use crate::errors::Result;
use crate::pipeline::Asset;
use crate::transform::{BUILTIN_COPY, LintReport, Transformer};

/// Passes bytes through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyTransformer;

impl Transformer for CopyTransformer {
    fn name(&self) -> &str {
        BUILTIN_COPY
    }

    fn fingerprint(&self) -> String {
        BUILTIN_COPY.to_string()
    }

    fn transform(&self, asset: Asset) -> BoxFuture<'_, Result<Asset>> {
        async move { Ok(asset) }.boxed()
    }

    fn check<'a>(&'a self, _asset: &'a Asset) -> BoxFuture<'a, Result<LintReport>> {
        async move {
            Ok(LintReport {
                passed: true,
                diagnostics: String::new(),
            })
        }
        .boxed()
    }
}
