//! Image generation constants and the proxy wire format.
//!
//! The request/response structs here are the JSON contract between the
//! browser-side composer and the backend proxy. Field names follow the
//! public API (`userAPIKey`, `iterativeMode`, `b64_json`, ...), not Rust
//! naming.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Seed pinned by consistency ("iterative") mode so successive generations
/// from one session stay visually related.
pub const CONSISTENCY_SEED: u64 = 123;

/// Default upstream image model.
pub const DEFAULT_IMAGE_MODEL: &str = "black-forest-labs/FLUX.1-schnell";

/// Output width in pixels.
pub const IMAGE_WIDTH: u32 = 1024;

/// Output height in pixels.
pub const IMAGE_HEIGHT: u32 = 768;

/// Diffusion steps. Schnell models are tuned for very few steps.
pub const IMAGE_STEPS: u32 = 3;

/// Default upstream chat model used to rewrite prompts.
pub const DEFAULT_REWRITE_MODEL: &str = "meta-llama/llama-3.1-70b-instruct:free";

/// Fixed message returned by `/optimize-prompt` when the rewrite fails.
pub const OPTIMIZE_FAILED_MESSAGE: &str = "Failed to optimize prompt";

/// The seed to send upstream for a request.
///
/// Consistency mode pins [`CONSISTENCY_SEED`]; otherwise no seed is sent and
/// the upstream provider seeds every request independently.
pub fn seed_for(consistency_mode: bool) -> Option<u64> {
    consistency_mode.then_some(CONSISTENCY_SEED)
}

// ---------------------------------------------------------------------------
// Prompt optimization
// ---------------------------------------------------------------------------

/// Body of `POST /optimize-prompt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizePromptRequest {
    pub prompt: String,
}

/// Successful response of `POST /optimize-prompt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizePromptResponse {
    #[serde(rename = "optimizedPrompt")]
    pub optimized_prompt: String,
}

// ---------------------------------------------------------------------------
// Image generation
// ---------------------------------------------------------------------------

/// Body of `POST /generate-image`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateImageRequest {
    pub prompt: String,
    /// Caller-supplied upstream credential. When present the rate limiter
    /// is bypassed and upstream bills this key.
    #[serde(rename = "userAPIKey", default, skip_serializing_if = "Option::is_none")]
    pub user_api_key: Option<String>,
    /// Consistency mode: pin the seed across requests.
    #[serde(rename = "iterativeMode")]
    pub iterative_mode: bool,
    /// Ask the server to rewrite the prompt before generating.
    #[serde(rename = "useOptimizedPrompt", default)]
    pub use_optimized_prompt: bool,
}

impl GenerateImageRequest {
    /// The caller's own API key, ignoring empty strings sent by forms.
    pub fn user_key(&self) -> Option<&str> {
        self.user_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Timing metadata reported by the image provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageTimings {
    /// Inference time in seconds as reported upstream.
    #[serde(default)]
    pub inference: f64,
}

/// A generated image: base64 payload plus timings. Treated as an opaque,
/// immutable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResult {
    pub b64_json: String,
    #[serde(default)]
    pub timings: ImageTimings,
}

impl ImageResult {
    /// Identity comparison on the payload. Two results are the same image
    /// when their encoded bytes match, regardless of timing metadata.
    pub fn same_image(&self, other: &ImageResult) -> bool {
        self.b64_json == other.b64_json
    }
}

/// Successful response of `POST /generate-image`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateImageResponse {
    #[serde(flatten)]
    pub image: ImageResult,
    /// The prompt actually sent upstream: the rewrite when server-side
    /// optimization succeeded, the raw prompt otherwise.
    #[serde(rename = "optimizedPrompt", default)]
    pub optimized_prompt: String,
}

/// JSON error envelope produced by the proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub code: Option<String>,
}
