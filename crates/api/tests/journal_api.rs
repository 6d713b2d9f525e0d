//! HTTP-level tests for the per-user dream journal.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, bearer_token, delete_auth, get, get_auth, post_json, post_json_auth, put_json_auth,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

fn draft(title: &str, dream_date: &str) -> serde_json::Value {
    json!({
        "title": title,
        "content": "a cat, cinematic lighting",
        "dream_date": dream_date,
        "generated_image_b64": "Y2F0",
    })
}

/// Create an entry through the API and return its id.
async fn create(app: axum::Router, token: &str, body: serde_json::Value) -> i64 {
    let response = post_json_auth(app, "/api/v1/journal", token, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_token_returns_401() {
    let app = common::build_test_app(common::lazy_pool());
    let response = get(app, "/api/v1/journal").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn garbage_token_returns_401() {
    let app = common::build_test_app(common::lazy_pool());
    let response = post_json_auth(
        app,
        "/api/v1/journal",
        "not-a-jwt",
        draft("Flying", "2024-03-01T00:00:00Z"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unauthenticated_create_is_rejected() {
    let app = common::build_test_app(common::lazy_pool());
    let response = post_json(app, "/api/v1/journal", draft("Flying", "2024-03-01T00:00:00Z")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn create_then_get_round_trip(pool: PgPool) {
    let app = common::build_test_app(pool);
    let user = Uuid::new_v4();
    let token = bearer_token(user);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/journal",
        &token,
        draft("Flying dream", "2024-03-01T00:00:00Z"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["data"]["id"].as_i64().unwrap();
    assert_eq!(created["data"]["user_id"], user.to_string());
    assert_eq!(created["data"]["generated_image_b64"], "Y2F0");

    let response = get_auth(app, &format!("/api/v1/journal/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["title"], "Flying dream");
    assert_eq!(json["data"]["content"], "a cat, cinematic lighting");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn list_is_scoped_and_newest_first(pool: PgPool) {
    let app = common::build_test_app(pool);
    let token = bearer_token(Uuid::new_v4());
    let stranger = bearer_token(Uuid::new_v4());

    create(app.clone(), &token, draft("Older", "2024-01-10T00:00:00Z")).await;
    create(app.clone(), &token, draft("Newer", "2024-02-10T00:00:00Z")).await;
    create(app.clone(), &stranger, draft("Not mine", "2024-02-11T00:00:00Z")).await;

    let response = get_auth(app.clone(), "/api/v1/journal", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let titles: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Newer", "Older"]);

    let response = get_auth(
        app,
        "/api/v1/journal?from=2024-02-01T00:00:00Z&to=2024-02-28T00:00:00Z",
        &token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["title"], "Newer");
}

#[tokio::test]
async fn inverted_range_returns_400() {
    let app = common::build_test_app(common::lazy_pool());
    let token = bearer_token(Uuid::new_v4());

    let response = get_auth(
        app,
        "/api/v1/journal?from=2024-03-01T00:00:00Z&to=2024-02-01T00:00:00Z",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn other_users_entry_is_not_found(pool: PgPool) {
    let app = common::build_test_app(pool);
    let owner = bearer_token(Uuid::new_v4());
    let stranger = bearer_token(Uuid::new_v4());

    let id = create(app.clone(), &owner, draft("Private", "2024-03-01T00:00:00Z")).await;

    let response = get_auth(app.clone(), &format!("/api/v1/journal/{id}"), &stranger).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], format!("Journal entry with id {id} not found"));

    let response = delete_auth(app.clone(), &format!("/api/v1/journal/{id}"), &stranger).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Still there for the owner.
    let response = get_auth(app, &format!("/api/v1/journal/{id}"), &owner).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn update_keeps_image(pool: PgPool) {
    let app = common::build_test_app(pool);
    let token = bearer_token(Uuid::new_v4());
    let id = create(app.clone(), &token, draft("Draft", "2024-03-01T00:00:00Z")).await;

    let response = put_json_auth(
        app,
        &format!("/api/v1/journal/{id}"),
        &token,
        json!({ "title": "Flying over the sea" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["title"], "Flying over the sea");
    assert_eq!(json["data"]["content"], "a cat, cinematic lighting");
    assert_eq!(json["data"]["generated_image_b64"], "Y2F0");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn delete_then_get_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let token = bearer_token(Uuid::new_v4());
    let id = create(app.clone(), &token, draft("Gone", "2024-03-01T00:00:00Z")).await;

    let response = delete_auth(app.clone(), &format!("/api/v1/journal/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(app, &format!("/api/v1/journal/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn blank_title_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);
    let token = bearer_token(Uuid::new_v4());

    let response = post_json_auth(
        app,
        "/api/v1/journal",
        &token,
        draft("   ", "2024-03-01T00:00:00Z"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Body size
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn large_image_is_saved(pool: PgPool) {
    let app = common::build_test_app(pool);
    let token = bearer_token(Uuid::new_v4());
    // Well past axum's 2 MB default body limit.
    let image = "AAAA".repeat(3 * 1024 * 1024 / 4);

    let response = post_json_auth(
        app,
        "/api/v1/journal",
        &token,
        json!({
            "title": "Big dream",
            "content": "a cat",
            "dream_date": "2024-03-01T00:00:00Z",
            "generated_image_b64": image,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(
        json["data"]["generated_image_b64"].as_str().unwrap().len(),
        3 * 1024 * 1024
    );
}

#[tokio::test]
async fn oversized_image_is_a_validation_error() {
    use dreamer_core::journal::MAX_IMAGE_B64_LENGTH;

    let app = common::build_test_app(common::lazy_pool());
    let token = bearer_token(Uuid::new_v4());
    let image = "A".repeat(MAX_IMAGE_B64_LENGTH + 4);

    let response = post_json_auth(
        app,
        "/api/v1/journal",
        &token,
        json!({
            "title": "Huge dream",
            "content": "a cat",
            "dream_date": "2024-03-01T00:00:00Z",
            "generated_image_b64": image,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn undecodable_image_is_a_validation_error() {
    let app = common::build_test_app(common::lazy_pool());
    let token = bearer_token(Uuid::new_v4());

    let response = post_json_auth(
        app,
        "/api/v1/journal",
        &token,
        draft_with_image("AB=C"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

fn draft_with_image(image: &str) -> serde_json::Value {
    json!({
        "title": "Broken",
        "content": "a cat",
        "dream_date": "2024-03-01T00:00:00Z",
        "generated_image_b64": image,
    })
}
