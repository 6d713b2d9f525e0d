use std::sync::Arc;

use dreamer_upstream::{ImageProvider, PromptRewriter};

use crate::config::ServerConfig;
use crate::rate_limit::RateLimiter;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Built once at startup and read-only afterwards. Cheaply cloneable.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: dreamer_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Prompt rewriter (chat model).
    pub rewriter: Arc<dyn PromptRewriter>,
    /// Image generator.
    pub images: Arc<dyn ImageProvider>,
    /// Anonymous quota.
    pub rate_limiter: Arc<RateLimiter>,
}
