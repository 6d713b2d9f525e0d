//! HTTP transport from the composer to the backend proxy.
//!
//! The browser never talks to the upstream models directly; everything goes
//! through `POST {base}/optimize-prompt` and `POST {base}/generate-image`.

use async_trait::async_trait;
use dreamer_core::generation::{
    ErrorBody, GenerateImageRequest, GenerateImageResponse, ImageResult, OptimizePromptRequest,
    OptimizePromptResponse,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::config::ComposerConfig;
use crate::error::ComposerError;

/// Operations the session needs from the proxy.
#[async_trait]
pub trait GenerationBackend: Send + Sync + 'static {
    /// Rewrite `prompt`. Returns the suggestion text.
    async fn optimize_prompt(&self, prompt: &str) -> Result<String, ComposerError>;

    /// Generate one image. No retries.
    async fn generate_image(
        &self,
        request: &GenerateImageRequest,
    ) -> Result<ImageResult, ComposerError>;
}

/// [`GenerationBackend`] over reqwest.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &ComposerConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create a backend reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &ComposerConfig) -> Self {
        Self {
            client,
            base_url: config.api_base_url.clone(),
        }
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ComposerError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn optimize_prompt(&self, prompt: &str) -> Result<String, ComposerError> {
        let body = OptimizePromptRequest {
            prompt: prompt.to_string(),
        };
        let response: OptimizePromptResponse = self.post("/optimize-prompt", &body).await?;
        Ok(response.optimized_prompt)
    }

    async fn generate_image(
        &self,
        request: &GenerateImageRequest,
    ) -> Result<ImageResult, ComposerError> {
        let response: GenerateImageResponse = self.post("/generate-image", request).await?;
        Ok(response.image)
    }
}

/// Map non-2xx responses to errors, keeping the body intact.
///
/// A 429 becomes [`ComposerError::RateLimited`] so callers can tell quota
/// exhaustion from generic failures.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ComposerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let remaining = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u32>().ok());
    let body = response.text().await.unwrap_or_default();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        return Err(ComposerError::RateLimited { message, remaining });
    }

    Err(ComposerError::Api {
        status: status.as_u16(),
        body,
    })
}
