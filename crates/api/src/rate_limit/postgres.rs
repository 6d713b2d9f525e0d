use async_trait::async_trait;
use chrono::DateTime;
use dreamer_db::repositories::RateLimitRepo;
use dreamer_db::DbPool;

use super::{RateLimitStore, StoreError};

/// Counters in the `rate_limit_windows` table, shared by every instance
/// pointing at the same database.
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateLimitStore for PgStore {
    async fn increment(&self, key: &str, window_start: i64) -> Result<u64, StoreError> {
        let start = DateTime::from_timestamp(window_start, 0).unwrap_or_default();
        let count = RateLimitRepo::increment(&self.pool, key, start).await?;
        Ok(count.max(0) as u64)
    }

    async fn purge_before(&self, window_start: i64) -> Result<u64, StoreError> {
        let Some(cutoff) = DateTime::from_timestamp(window_start, 0) else {
            return Ok(0);
        };
        Ok(RateLimitRepo::purge_before(&self.pool, cutoff).await?)
    }
}
