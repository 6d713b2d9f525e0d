use axum::routing::post;
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// Proxy routes, merged at the `/api/v1` root.
///
/// ```text
/// POST /optimize-prompt   -> optimize_prompt
/// POST /generate-image    -> generate_image
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/optimize-prompt", post(generation::optimize_prompt))
        .route("/generate-image", post(generation::generate_image))
}
