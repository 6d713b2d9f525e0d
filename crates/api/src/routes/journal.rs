use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use dreamer_core::journal::{MAX_CONTENT_LENGTH, MAX_IMAGE_B64_LENGTH, MAX_TITLE_LENGTH};

use crate::handlers::journal;
use crate::state::AppState;

/// Room for the JSON framing and the date around the validated fields.
const ENVELOPE_HEADROOM: usize = 4 * 1024;

/// Largest request body the journal accepts. An entry carrying the largest
/// permitted image must reach validation instead of being cut off earlier.
pub const MAX_JOURNAL_BODY_BYTES: usize =
    MAX_IMAGE_B64_LENGTH + MAX_TITLE_LENGTH + MAX_CONTENT_LENGTH + ENVELOPE_HEADROOM;

/// Journal routes mounted at `/journal`.
///
/// ```text
/// GET    /        -> list_entries
/// POST   /        -> create_entry
/// GET    /{id}    -> get_entry
/// PUT    /{id}    -> update_entry
/// DELETE /{id}    -> delete_entry
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(journal::list_entries).post(journal::create_entry))
        .route(
            "/{id}",
            get(journal::get_entry)
                .put(journal::update_entry)
                .delete(journal::delete_entry),
        )
        .layer(DefaultBodyLimit::max(MAX_JOURNAL_BODY_BYTES))
}
