//! Repository for the `dream_journals` table.
//!
//! Every query is scoped by `user_id`: a row owned by someone else is
//! indistinguishable from a missing row.

use dreamer_core::types::{DbId, Timestamp, UserId};
use sqlx::PgPool;

use crate::models::journal_entry::{CreateJournalEntry, JournalEntry, UpdateJournalEntry};

/// Column list for dream_journals queries.
const COLUMNS: &str = "id, user_id, title, content, dream_date, generated_image_b64, \
    created_at, updated_at";

/// Provides CRUD operations for journal entries.
pub struct JournalEntryRepo;

impl JournalEntryRepo {
    /// Insert a new journal entry for `user_id`. Returns the created row.
    pub async fn create(
        pool: &PgPool,
        user_id: UserId,
        input: &CreateJournalEntry,
    ) -> Result<JournalEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO dream_journals
                (user_id, title, content, dream_date, generated_image_b64)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JournalEntry>(&query)
            .bind(user_id)
            .bind(&input.title)
            .bind(&input.content)
            .bind(input.dream_date)
            .bind(&input.generated_image_b64)
            .fetch_one(pool)
            .await
    }

    /// Find one of the user's entries by primary key.
    pub async fn find_by_id(
        pool: &PgPool,
        user_id: UserId,
        id: DbId,
    ) -> Result<Option<JournalEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM dream_journals WHERE id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, JournalEntry>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// List the user's entries, newest dream date first, optionally bounded
    /// to an inclusive `[from, to]` dream-date range.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: UserId,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<Vec<JournalEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM dream_journals
             WHERE user_id = $1
               AND ($2::timestamptz IS NULL OR dream_date >= $2)
               AND ($3::timestamptz IS NULL OR dream_date <= $3)
             ORDER BY dream_date DESC, id DESC"
        );
        sqlx::query_as::<_, JournalEntry>(&query)
            .bind(user_id)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }

    /// Apply a partial update. Returns `None` if the entry does not exist
    /// for this user.
    pub async fn update(
        pool: &PgPool,
        user_id: UserId,
        id: DbId,
        input: &UpdateJournalEntry,
    ) -> Result<Option<JournalEntry>, sqlx::Error> {
        let query = format!(
            "UPDATE dream_journals SET
                title = COALESCE($3, title),
                content = COALESCE($4, content),
                dream_date = COALESCE($5, dream_date),
                updated_at = now()
             WHERE id = $1 AND user_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JournalEntry>(&query)
            .bind(id)
            .bind(user_id)
            .bind(&input.title)
            .bind(&input.content)
            .bind(input.dream_date)
            .fetch_optional(pool)
            .await
    }

    /// Delete one of the user's entries. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, user_id: UserId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM dream_journals WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
