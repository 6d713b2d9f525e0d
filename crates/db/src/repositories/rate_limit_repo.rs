//! Repository for the `rate_limit_windows` table.
//!
//! One row per (key, window). Counting is a single upsert so concurrent
//! requests from several API processes never lose an increment.

use dreamer_core::types::Timestamp;
use sqlx::PgPool;

/// Fixed-window counters backed by Postgres.
pub struct RateLimitRepo;

impl RateLimitRepo {
    /// Count one request for `key` in the window starting at
    /// `window_start`. Returns the count after the increment.
    pub async fn increment(
        pool: &PgPool,
        key: &str,
        window_start: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "INSERT INTO rate_limit_windows (key, window_start, count)
             VALUES ($1, $2, 1)
             ON CONFLICT (key, window_start)
             DO UPDATE SET count = rate_limit_windows.count + 1
             RETURNING count",
        )
        .bind(key)
        .bind(window_start)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Delete windows that started before `before`. Returns rows removed.
    pub async fn purge_before(pool: &PgPool, before: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM rate_limit_windows WHERE window_start < $1")
            .bind(before)
            .execute(pool)
            .await?;
        tracing::debug!(removed = result.rows_affected(), "Purged expired rate-limit windows");
        Ok(result.rows_affected())
    }
}
