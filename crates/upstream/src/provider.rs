//! Trait seams between the API handlers and the upstream services.

use async_trait::async_trait;
use dreamer_core::generation::ImageResult;

use crate::error::UpstreamError;

/// Parameters of one image generation, independent of the wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageParams {
    pub prompt: String,
    /// Consistency mode: pin the seed so generations stay related.
    pub consistency_mode: bool,
}

/// Rewrites a raw prompt into a richer one.
#[async_trait]
pub trait PromptRewriter: Send + Sync {
    async fn rewrite(&self, prompt: &str) -> Result<String, UpstreamError>;
}

/// Produces images from prompts.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generate one image.
    ///
    /// `credential` is the caller's own API key. When present it replaces
    /// the server key as the billing identity.
    async fn generate(
        &self,
        params: &ImageParams,
        credential: Option<&str>,
    ) -> Result<ImageResult, UpstreamError>;
}
