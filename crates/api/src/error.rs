use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dreamer_core::error::CoreError;
use dreamer_core::generation::OPTIMIZE_FAILED_MESSAGE;
use dreamer_core::rate_limit::{RateLimitDecision, LIMIT_EXCEEDED_MESSAGE};
use dreamer_upstream::UpstreamError;
use serde_json::json;

use crate::rate_limit::apply_quota_headers;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds upstream and quota variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `dreamer_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The image model (or another upstream) failed. The upstream message
    /// is passed through verbatim.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The prompt rewrite failed. Reported with a fixed message.
    #[error("Prompt optimization failed: {0}")]
    OptimizeFailed(UpstreamError),

    /// The anonymous quota for this window is exhausted.
    #[error("Rate limit exceeded")]
    RateLimited(RateLimitDecision),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- Upstream errors ---
            AppError::Upstream(err) => {
                tracing::error!(error = %err, "Upstream request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UPSTREAM_ERROR",
                    err.to_string(),
                )
            }
            AppError::OptimizeFailed(err) => {
                tracing::warn!(error = %err, "Prompt optimization failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "OPTIMIZE_FAILED",
                    OPTIMIZE_FAILED_MESSAGE.to_string(),
                )
            }

            // --- Quota ---
            AppError::RateLimited(decision) => {
                let body = json!({
                    "error": LIMIT_EXCEEDED_MESSAGE,
                    "code": "RATE_LIMITED",
                });
                let mut response = (StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response();
                apply_quota_headers(response.headers_mut(), decision);
                return response;
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            let constraint = db_err.constraint().unwrap_or("unknown");
            (
                StatusCode::CONFLICT,
                "CONFLICT",
                format!("Duplicate value violates unique constraint: {constraint}"),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
