//! Fixed-window rate limiting arithmetic and client identity resolution.
//!
//! Pure functions only. Counting lives behind a store in the API crate;
//! this module decides which window a request falls into, what key it is
//! counted under and whether the resulting count is within quota.

use std::net::IpAddr;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default number of anonymous requests allowed per window.
pub const DEFAULT_MAX_REQUESTS: u32 = 100;

/// Default window length: one day.
pub const DEFAULT_WINDOW_SECS: u64 = 86_400;

/// Identity used when no network address can be determined.
pub const FALLBACK_IDENTITY: &str = "0.0.0.0";

/// Namespace prepended to every storage key.
pub const KEY_PREFIX: &str = "dreamer";

/// User-facing message for an exhausted quota.
pub const LIMIT_EXCEEDED_MESSAGE: &str =
    "No requests left. Please add your own API key or try again in 24h.";

/// Bucket counting `/generate-image` calls.
pub const BUCKET_GENERATE: &str = "generate";

/// Bucket counting `/optimize-prompt` calls.
pub const BUCKET_OPTIMIZE: &str = "optimize";

// ---------------------------------------------------------------------------
// Window policy
// ---------------------------------------------------------------------------

/// How many requests are allowed per window of `window_secs` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window_secs: DEFAULT_WINDOW_SECS,
        }
    }
}

impl WindowPolicy {
    /// Validate a policy: both the quota and the window must be positive.
    pub fn new(max_requests: u32, window_secs: u64) -> Result<Self, CoreError> {
        if max_requests == 0 {
            return Err(CoreError::Validation(
                "Rate limit must allow at least one request per window".to_string(),
            ));
        }
        if window_secs == 0 {
            return Err(CoreError::Validation(
                "Rate limit window must be at least one second".to_string(),
            ));
        }
        Ok(Self {
            max_requests,
            window_secs,
        })
    }

    /// Start of the window containing `now` (Unix seconds).
    ///
    /// Windows are aligned to multiples of the window length since the
    /// epoch, so every process computes the same boundaries.
    pub fn window_start(&self, now: i64) -> i64 {
        let len = self.window_secs as i64;
        now - now.rem_euclid(len)
    }

    /// Unix second at which the window containing `now` resets.
    pub fn window_reset(&self, now: i64) -> i64 {
        self.window_start(now) + self.window_secs as i64
    }

    /// Turn the post-increment count of the current window into a decision.
    pub fn decide(&self, count: u64, now: i64) -> RateLimitDecision {
        let limit = self.max_requests as u64;
        RateLimitDecision {
            allowed: count <= limit,
            limit: self.max_requests,
            remaining: limit.saturating_sub(count) as u32,
            reset_at: self.window_reset(now),
        }
    }
}

/// Outcome of counting one request against its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Unix seconds when the current window ends.
    pub reset_at: i64,
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Resolve the network identity a request is counted under.
///
/// Order: first hop of `X-Forwarded-For`, then `X-Real-IP`, then the peer
/// address of the socket, then [`FALLBACK_IDENTITY`].
pub fn resolve_identity(
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
    peer: Option<IpAddr>,
) -> String {
    if let Some(first) = forwarded_for
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }
    if let Some(ip) = real_ip.map(str::trim).filter(|v| !v.is_empty()) {
        return ip.to_string();
    }
    peer.map(|ip| ip.to_string())
        .unwrap_or_else(|| FALLBACK_IDENTITY.to_string())
}

/// Storage key for an identity within a bucket. The identity is hashed so
/// raw addresses never reach the backing store.
pub fn storage_key(bucket: &str, identity: &str) -> String {
    let digest = Sha256::digest(identity.as_bytes());
    format!("{KEY_PREFIX}:{bucket}:{digest:x}")
}
