//! Image generation through the upstream images endpoint.

use async_trait::async_trait;
use dreamer_core::generation::{seed_for, ImageResult, IMAGE_HEIGHT, IMAGE_STEPS, IMAGE_WIDTH};
use serde::{Deserialize, Serialize};

use crate::config::ImageConfig;
use crate::error::{parse_response, UpstreamError};
use crate::provider::{ImageParams, ImageProvider};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Body of `POST {base}/images/generations`.
#[derive(Debug, Serialize)]
pub struct ImageGenerationBody {
    pub model: String,
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub n: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageResult>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the image-generation model.
pub struct ImageClient {
    client: reqwest::Client,
    config: ImageConfig,
}

impl ImageClient {
    pub fn new(config: ImageConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: ImageConfig) -> Self {
        Self { client, config }
    }

    /// Build the upstream body for one generation.
    ///
    /// Consistency mode pins the seed; otherwise the field is omitted.
    pub fn request_body(&self, params: &ImageParams) -> ImageGenerationBody {
        ImageGenerationBody {
            model: self.config.model.clone(),
            prompt: params.prompt.clone(),
            width: IMAGE_WIDTH,
            height: IMAGE_HEIGHT,
            steps: IMAGE_STEPS,
            n: 1,
            seed: seed_for(params.consistency_mode),
            response_format: "base64",
        }
    }
}

#[async_trait]
impl ImageProvider for ImageClient {
    async fn generate(
        &self,
        params: &ImageParams,
        credential: Option<&str>,
    ) -> Result<ImageResult, UpstreamError> {
        let api_key = credential.unwrap_or(&self.config.api_key);

        let mut request = self
            .client
            .post(format!(
                "{}/images/generations",
                self.config.effective_base_url()
            ))
            .bearer_auth(api_key)
            .json(&self.request_body(params));

        if let Some(helicone_key) = &self.config.helicone_api_key {
            request = request
                .header("Helicone-Auth", format!("Bearer {helicone_key}"))
                .header(
                    "Helicone-Property-BYOK",
                    if credential.is_some() { "true" } else { "false" },
                );
        }

        let response: ImagesResponse = parse_response(request.send().await?).await?;

        let image = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamError::EmptyResponse("image response had no data".into()))?;

        tracing::info!(
            model = %self.config.model,
            consistency_mode = params.consistency_mode,
            byok = credential.is_some(),
            inference_secs = image.timings.inference,
            "Image generated",
        );
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use dreamer_core::generation::{CONSISTENCY_SEED, DEFAULT_IMAGE_MODEL};
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn config(base_url: String) -> ImageConfig {
        ImageConfig {
            base_url,
            api_key: "server-key".into(),
            model: DEFAULT_IMAGE_MODEL.into(),
            helicone_api_key: None,
        }
    }

    fn params(prompt: &str, consistency_mode: bool) -> ImageParams {
        ImageParams {
            prompt: prompt.into(),
            consistency_mode,
        }
    }

    #[test]
    fn consistency_mode_pins_seed_across_requests() {
        let client = ImageClient::new(config("http://unused".into()));
        let first = client.request_body(&params("a red fox in snow", true));
        let second = client.request_body(&params("a red fox in snow", true));
        assert_eq!(first.seed, Some(CONSISTENCY_SEED));
        assert_eq!(first.seed, second.seed);
    }

    #[test]
    fn free_mode_omits_seed_field() {
        let client = ImageClient::new(config("http://unused".into()));
        let body = serde_json::to_value(client.request_body(&params("a cat", false))).unwrap();
        assert!(body.get("seed").is_none());
        assert_eq!(body["width"], 1024);
        assert_eq!(body["height"], 768);
        assert_eq!(body["steps"], 3);
        assert_eq!(body["response_format"], "base64");
    }

    #[tokio::test]
    async fn server_key_used_without_credential() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/images/generations")
            .match_header("authorization", "Bearer server-key")
            .match_body(Matcher::PartialJson(json!({ "prompt": "a cat", "seed": 123 })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"b64_json":"aW1n","timings":{"inference":0.31}}]}"#)
            .create_async()
            .await;

        let client = ImageClient::new(config(server.url()));
        let image = client.generate(&params("a cat", true), None).await.unwrap();

        assert_eq!(image.b64_json, "aW1n");
        assert_eq!(image.timings.inference, 0.31);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn caller_credential_replaces_server_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/images/generations")
            .match_header("authorization", "Bearer user-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"b64_json":"aW1n"}]}"#)
            .create_async()
            .await;

        let client = ImageClient::new(config(server.url()));
        let image = client
            .generate(&params("a cat", false), Some("user-key"))
            .await
            .unwrap();

        assert_eq!(image.timings.inference, 0.0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upstream_failure_keeps_raw_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/images/generations")
            .with_status(400)
            .with_body(r#"{"error":{"message":"prompt flagged"}}"#)
            .create_async()
            .await;

        let client = ImageClient::new(config(server.url()));
        match client.generate(&params("a cat", false), None).await.unwrap_err() {
            UpstreamError::ApiError { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("prompt flagged"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
