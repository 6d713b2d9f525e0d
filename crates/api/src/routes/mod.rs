pub mod generation;
pub mod health;
pub mod journal;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /optimize-prompt                 rewrite a prompt (POST, rate limited)
/// /generate-image                  generate an image (POST, rate limited)
///
/// /journal                         list, create (requires auth)
/// /journal/{id}                    get, update, delete (requires auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(generation::router())
        .nest("/journal", journal::router())
}
