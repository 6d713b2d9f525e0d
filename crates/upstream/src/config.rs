//! Upstream endpoint configuration.

use dreamer_core::generation::{DEFAULT_IMAGE_MODEL, DEFAULT_REWRITE_MODEL};

/// Default OpenAI-compatible chat endpoint.
pub const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default image-generation endpoint.
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://api.together.xyz/v1";

/// Image endpoint used when request observability is enabled.
pub const HELICONE_IMAGE_BASE_URL: &str = "https://together.helicone.ai/v1";

/// Settings for the prompt-rewriting chat model.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Sent as `HTTP-Referer` for upstream attribution.
    pub site_url: Option<String>,
    /// Sent as `X-Title` for upstream attribution.
    pub site_name: Option<String>,
}

/// Settings for the image-generation model.
#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// When set, requests are routed through the observability proxy.
    pub helicone_api_key: Option<String>,
}

impl LlmConfig {
    /// Load from environment variables with defaults.
    ///
    /// | Env Var        | Default                        |
    /// |----------------|--------------------------------|
    /// | `LLM_BASE_URL` | `https://openrouter.ai/api/v1` |
    /// | `LLM_API_KEY`  | empty                          |
    /// | `LLM_MODEL`    | llama 3.1 70b instruct (free)  |
    /// | `SITE_URL`     | unset                          |
    /// | `SITE_NAME`    | unset                          |
    pub fn from_env() -> Self {
        Self {
            base_url: env_or("LLM_BASE_URL", DEFAULT_LLM_BASE_URL),
            api_key: env_or("LLM_API_KEY", ""),
            model: env_or("LLM_MODEL", DEFAULT_REWRITE_MODEL),
            site_url: env_opt("SITE_URL"),
            site_name: env_opt("SITE_NAME"),
        }
    }
}

impl ImageConfig {
    /// Load from environment variables with defaults.
    ///
    /// | Env Var            | Default                       |
    /// |--------------------|-------------------------------|
    /// | `IMAGE_BASE_URL`   | `https://api.together.xyz/v1` |
    /// | `IMAGE_API_KEY`    | empty                         |
    /// | `IMAGE_MODEL`      | `black-forest-labs/FLUX.1-schnell` |
    /// | `HELICONE_API_KEY` | unset                         |
    pub fn from_env() -> Self {
        Self {
            base_url: env_or("IMAGE_BASE_URL", DEFAULT_IMAGE_BASE_URL),
            api_key: env_or("IMAGE_API_KEY", ""),
            model: env_or("IMAGE_MODEL", DEFAULT_IMAGE_MODEL),
            helicone_api_key: env_opt("HELICONE_API_KEY"),
        }
    }

    /// Base URL requests are sent to, accounting for observability routing.
    pub fn effective_base_url(&self) -> &str {
        if self.helicone_api_key.is_some() {
            HELICONE_IMAGE_BASE_URL
        } else {
            &self.base_url
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
