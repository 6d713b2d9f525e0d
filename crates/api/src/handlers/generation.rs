//! Handlers for the two proxy endpoints.
//!
//! Both keep the browser away from the upstream keys. Anonymous callers
//! are counted by the rate limiter; callers supplying their own image key
//! skip it entirely.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dreamer_core::generation::{
    GenerateImageRequest, GenerateImageResponse, OptimizePromptRequest, OptimizePromptResponse,
};
use dreamer_core::prompt::validate_prompt;
use dreamer_core::rate_limit::{RateLimitDecision, BUCKET_GENERATE, BUCKET_OPTIMIZE};
use dreamer_upstream::provider::ImageParams;

use crate::error::{AppError, AppResult};
use crate::middleware::client_ip::ClientIdentity;
use crate::rate_limit::apply_quota_headers;
use crate::state::AppState;

/// POST /api/v1/optimize-prompt
///
/// Rewrite a prompt with the chat model. Failures are reported with a
/// fixed message; the caller falls back to its raw prompt.
pub async fn optimize_prompt(
    State(state): State<AppState>,
    ClientIdentity(identity): ClientIdentity,
    Json(input): Json<OptimizePromptRequest>,
) -> AppResult<Response> {
    validate_prompt(&input.prompt)?;
    let quota = enforce_quota(&state, BUCKET_OPTIMIZE, &identity).await?;

    let optimized_prompt = state
        .rewriter
        .rewrite(&input.prompt)
        .await
        .map_err(AppError::OptimizeFailed)?;

    tracing::info!(
        prompt_len = input.prompt.len(),
        optimized_len = optimized_prompt.len(),
        "Prompt optimized",
    );

    Ok(with_quota(
        Json(OptimizePromptResponse { optimized_prompt }),
        quota,
    ))
}

/// POST /api/v1/generate-image
///
/// Generate one image. With `useOptimizedPrompt` the prompt is rewritten
/// first; a failed rewrite falls back to the raw prompt instead of failing
/// the request.
pub async fn generate_image(
    State(state): State<AppState>,
    ClientIdentity(identity): ClientIdentity,
    Json(input): Json<GenerateImageRequest>,
) -> AppResult<Response> {
    validate_prompt(&input.prompt)?;

    let user_key = input.user_key();
    let quota = match user_key {
        Some(_) => None,
        None => enforce_quota(&state, BUCKET_GENERATE, &identity).await?,
    };

    let prompt = if input.use_optimized_prompt {
        match state.rewriter.rewrite(&input.prompt).await {
            Ok(rewritten) => rewritten,
            Err(e) => {
                tracing::warn!(error = %e, "Server-side optimization failed, using raw prompt");
                input.prompt.clone()
            }
        }
    } else {
        input.prompt.clone()
    };

    let params = ImageParams {
        prompt,
        consistency_mode: input.iterative_mode,
    };
    let image = state.images.generate(&params, user_key).await?;

    // Echo what was actually sent upstream.
    Ok(with_quota(
        Json(GenerateImageResponse {
            image,
            optimized_prompt: params.prompt,
        }),
        quota,
    ))
}

/// Count the request and reject it when the window is exhausted.
async fn enforce_quota(
    state: &AppState,
    bucket: &str,
    identity: &str,
) -> AppResult<Option<RateLimitDecision>> {
    match state.rate_limiter.check(bucket, identity).await {
        Some(decision) if !decision.allowed => Err(AppError::RateLimited(decision)),
        other => Ok(other),
    }
}

fn with_quota(body: impl IntoResponse, quota: Option<RateLimitDecision>) -> Response {
    let mut response = body.into_response();
    if let Some(decision) = quota {
        apply_quota_headers(response.headers_mut(), &decision);
    }
    response
}
