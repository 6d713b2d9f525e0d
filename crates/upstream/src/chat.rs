//! Prompt rewriting through an OpenAI-compatible chat-completion endpoint.

use async_trait::async_trait;
use dreamer_core::prompt::clean_rewrite;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{parse_response, UpstreamError};
use crate::provider::PromptRewriter;

/// Instructions given to the model for every rewrite.
pub const SYSTEM_PROMPT: &str = "You are an AI assistant that helps optimize image generation \
prompts. Your task is to improve the given prompt to make it more detailed and effective for \
image generation. If the prompt is in Chinese or another language, translate it to English \
first and output the optimized prompt in English. Important: you must only output the \
optimized prompt without any other text or comments.";

/// Sampling temperature for rewrites.
const TEMPERATURE: f32 = 0.7;

/// Upper bound on the rewritten prompt length, in tokens.
const MAX_TOKENS: u32 = 150;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the prompt-rewriting model.
pub struct ChatRewriter {
    client: reqwest::Client,
    config: LlmConfig,
}

impl ChatRewriter {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Create a rewriter reusing an existing [`reqwest::Client`]
    /// (connection pooling with the image client).
    pub fn with_client(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }

    /// Build the chat-completion body for a prompt.
    pub fn request_body(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: SYSTEM_PROMPT.into(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: format!("\"{prompt}\""),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }
}

#[async_trait]
impl PromptRewriter for ChatRewriter {
    async fn rewrite(&self, prompt: &str) -> Result<String, UpstreamError> {
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(prompt));

        if let Some(site_url) = &self.config.site_url {
            request = request.header("HTTP-Referer", site_url);
        }
        if let Some(site_name) = &self.config.site_name {
            request = request.header("X-Title", site_name);
        }

        let response: ChatCompletionResponse = parse_response(request.send().await?).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let rewritten = clean_rewrite(&content)
            .ok_or_else(|| UpstreamError::EmptyResponse("chat completion had no content".into()))?;

        tracing::debug!(
            model = %self.config.model,
            original_len = prompt.len(),
            rewritten_len = rewritten.len(),
            "Prompt rewritten",
        );
        Ok(rewritten)
    }
}
