//! Fixed-window rate limiting of anonymous requests.
//!
//! [`RateLimiter`] counts one request per call against the window the
//! current time falls into and turns the count into a
//! [`RateLimitDecision`]. Counting happens in a pluggable
//! [`RateLimitStore`]; without a store the limiter is a no-op.
//!
//! Store failures never block a request: the limiter logs a warning and
//! lets it through.

pub mod memory;
pub mod postgres;
pub mod retention;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use dreamer_core::rate_limit::{storage_key, RateLimitDecision, WindowPolicy};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors from a backing store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Rate limit store database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Where window counters live.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one request for `key` in the window starting at
    /// `window_start` (Unix seconds). Returns the count after incrementing.
    async fn increment(&self, key: &str, window_start: i64) -> Result<u64, StoreError>;

    /// Drop every counter whose window started before `window_start`.
    /// Returns how many were removed.
    async fn purge_before(&self, window_start: i64) -> Result<u64, StoreError>;
}

pub struct RateLimiter {
    store: Option<Arc<dyn RateLimitStore>>,
    policy: WindowPolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, policy: WindowPolicy) -> Self {
        Self {
            store: Some(store),
            policy,
        }
    }

    /// A limiter that never counts and never rejects.
    pub fn disabled() -> Self {
        Self {
            store: None,
            policy: WindowPolicy::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn policy(&self) -> WindowPolicy {
        self.policy
    }

    /// Count a request from `identity` in `bucket` now.
    ///
    /// Returns `None` when no decision could be made (limiter disabled or
    /// store unavailable); the request should proceed.
    pub async fn check(&self, bucket: &str, identity: &str) -> Option<RateLimitDecision> {
        self.check_at(bucket, identity, chrono::Utc::now().timestamp())
            .await
    }

    /// [`check`](Self::check) at an explicit Unix time.
    pub async fn check_at(
        &self,
        bucket: &str,
        identity: &str,
        now: i64,
    ) -> Option<RateLimitDecision> {
        let store = self.store.as_ref()?;
        let key = storage_key(bucket, identity);
        let window_start = self.policy.window_start(now);

        match store.increment(&key, window_start).await {
            Ok(count) => {
                let decision = self.policy.decide(count, now);
                if !decision.allowed {
                    tracing::info!(bucket, count, limit = decision.limit, "Rate limit exceeded");
                }
                Some(decision)
            }
            Err(e) => {
                tracing::warn!(error = %e, bucket, "Rate limit store unavailable, allowing request");
                None
            }
        }
    }
}

impl RateLimiter {
    /// Remove counters of windows that ended before the one containing
    /// `now`. Returns `None` when disabled or when the store failed.
    pub async fn purge_expired_at(&self, now: i64) -> Option<u64> {
        let store = self.store.as_ref()?;
        match store.purge_before(self.policy.window_start(now)).await {
            Ok(removed) => Some(removed),
            Err(e) => {
                tracing::warn!(error = %e, "Rate limit purge failed");
                None
            }
        }
    }
}

/// Header carrying the window quota.
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
/// Header carrying the requests left in the window.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
/// Header carrying the Unix second at which the window resets.
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Write the `X-RateLimit-*` headers for `decision`.
pub fn apply_quota_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    let pairs = [
        (LIMIT_HEADER, decision.limit.to_string()),
        (REMAINING_HEADER, decision.remaining.to_string()),
        (RESET_HEADER, decision.reset_at.to_string()),
    ];
    for (name, value) in pairs {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
}
