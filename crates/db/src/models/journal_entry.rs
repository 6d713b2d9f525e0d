//! Dream journal models and DTOs.
//!
//! Defines the database row struct for `dream_journals` and the
//! create/update types used by the API layer.

use dreamer_core::types::{DbId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A journal row from the `dream_journals` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: DbId,
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    pub dream_date: Timestamp,
    pub generated_image_b64: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for creating a journal entry. The owner comes from the
/// authenticated request, never from the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJournalEntry {
    pub title: String,
    pub content: String,
    pub dream_date: Timestamp,
    #[serde(default)]
    pub generated_image_b64: Option<String>,
}

// ---------------------------------------------------------------------------
// Update DTO
// ---------------------------------------------------------------------------

/// Partial update. `None` fields keep their stored value; the image is
/// never changed after creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateJournalEntry {
    pub title: Option<String>,
    pub content: Option<String>,
    pub dream_date: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Query params
// ---------------------------------------------------------------------------

/// Query parameters for listing journal entries by dream date. Both
/// bounds are inclusive and optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JournalListParams {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}
