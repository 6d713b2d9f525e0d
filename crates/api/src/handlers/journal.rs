//! Handlers for the per-user dream journal.
//!
//! Every query is scoped to the authenticated user; entries owned by
//! someone else are reported as not found.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use dreamer_core::error::CoreError;
use dreamer_core::journal::{
    validate_content, validate_date_range, validate_image_b64, validate_title,
};
use dreamer_core::types::DbId;
use dreamer_db::models::journal_entry::{
    CreateJournalEntry, JournalListParams, UpdateJournalEntry,
};
use dreamer_db::repositories::JournalEntryRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Journal entry",
        id,
    })
}

/// GET /api/v1/journal?from=&to=
///
/// List the caller's entries, newest dream date first.
pub async fn list_entries(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<JournalListParams>,
) -> AppResult<impl IntoResponse> {
    validate_date_range(params.from, params.to)?;

    let entries =
        JournalEntryRepo::list_for_user(&state.pool, auth.user_id, params.from, params.to).await?;

    Ok(Json(DataResponse { data: entries }))
}

/// POST /api/v1/journal
pub async fn create_entry(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateJournalEntry>,
) -> AppResult<impl IntoResponse> {
    validate_title(&input.title)?;
    validate_content(&input.content)?;
    if let Some(image) = &input.generated_image_b64 {
        validate_image_b64(image)?;
    }

    let entry = JournalEntryRepo::create(&state.pool, auth.user_id, &input).await?;

    tracing::info!(
        journal_id = entry.id,
        user_id = %auth.user_id,
        has_image = entry.generated_image_b64.is_some(),
        "Journal entry created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

/// GET /api/v1/journal/{id}
pub async fn get_entry(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let entry = JournalEntryRepo::find_by_id(&state.pool, auth.user_id, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(DataResponse { data: entry }))
}

/// PUT /api/v1/journal/{id}
///
/// Update title, content or dream date. The attached image is immutable.
pub async fn update_entry(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateJournalEntry>,
) -> AppResult<impl IntoResponse> {
    if let Some(title) = &input.title {
        validate_title(title)?;
    }
    if let Some(content) = &input.content {
        validate_content(content)?;
    }

    let entry = JournalEntryRepo::update(&state.pool, auth.user_id, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(journal_id = id, user_id = %auth.user_id, "Journal entry updated");

    Ok(Json(DataResponse { data: entry }))
}

/// DELETE /api/v1/journal/{id}
pub async fn delete_entry(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let deleted = JournalEntryRepo::delete(&state.pool, auth.user_id, id).await?;

    if !deleted {
        return Err(not_found(id));
    }

    tracing::info!(journal_id = id, user_id = %auth.user_id, "Journal entry deleted");

    Ok(StatusCode::NO_CONTENT)
}
