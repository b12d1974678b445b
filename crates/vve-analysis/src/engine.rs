//! Remote analysis capability.

use std::path::Path;

use async_trait::async_trait;
use schemars::schema::RootSchema;
use tokio_util::sync::CancellationToken;

use crate::error::AnalysisResult;

/// A remote engine that turns a media file plus instructions into JSON.
///
/// `schema` is the native description of the expected output; each engine
/// translates it into whatever its API accepts. The returned string is the
/// engine's raw answer and is validated by the caller.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    async fn generate(
        &self,
        media: &Path,
        schema: &RootSchema,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> AnalysisResult<String>;
}
