//! Periodic cleanup of finished rate-limit windows.
//!
//! Counters only matter for the window they were counted in. This task
//! drops older ones so neither store grows with the number of distinct
//! clients ever seen.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::RateLimiter;

/// Upper bound on the time between two cleanups.
const MAX_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Run the retention loop until `cancel` is triggered.
///
/// Runs once immediately, then every hour or every window, whichever is
/// shorter.
pub async fn run(limiter: Arc<RateLimiter>, cancel: CancellationToken) {
    let every = Duration::from_secs(limiter.policy().window_secs).min(MAX_CLEANUP_INTERVAL);
    tracing::info!(interval_secs = every.as_secs(), "Rate limit retention started");

    let mut interval = tokio::time::interval(every);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Rate limit retention stopping");
                break;
            }
            _ = interval.tick() => {
                let now = chrono::Utc::now().timestamp();
                match limiter.purge_expired_at(now).await {
                    Some(removed) if removed > 0 => {
                        tracing::info!(removed, "Purged expired rate limit windows");
                    }
                    Some(_) => tracing::debug!("Rate limit retention: nothing to purge"),
                    // Already logged by the limiter.
                    None => {}
                }
            }
        }
    }
}
