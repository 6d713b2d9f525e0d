#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use dreamer_api::auth::jwt::JwtConfig;
use dreamer_api::config::{RateLimitConfig, ServerConfig};
use dreamer_api::rate_limit::RateLimiter;
use dreamer_api::router::build_app_router;
use dreamer_api::state::AppState;
use dreamer_core::generation::{ImageResult, ImageTimings};
use dreamer_upstream::provider::ImageParams;
use dreamer_upstream::{ImageProvider, PromptRewriter, UpstreamError};

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default),
/// a 30-second request timeout and no rate limiting.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            audience: None,
        },
        rate_limit: RateLimitConfig::disabled(),
    }
}

/// A pool that never connects. Enough for routes that do not touch the
/// database.
pub fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .connect_lazy("postgres://localhost/unused")
        .expect("lazy pool should build")
}

// ---------------------------------------------------------------------------
// Upstream fakes
// ---------------------------------------------------------------------------

/// Records every rewrite request. Appends ", cinematic lighting" unless
/// told to fail.
#[derive(Default)]
pub struct FakeRewriter {
    pub calls: Mutex<Vec<String>>,
    pub fail: bool,
}

impl FakeRewriter {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PromptRewriter for FakeRewriter {
    async fn rewrite(&self, prompt: &str) -> Result<String, UpstreamError> {
        self.calls.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(UpstreamError::ApiError {
                status: 503,
                body: "model overloaded".into(),
            });
        }
        Ok(format!("{prompt}, cinematic lighting"))
    }
}

/// Records every image request with the credential it was sent with.
#[derive(Default)]
pub struct FakeImages {
    pub calls: Mutex<Vec<(ImageParams, Option<String>)>>,
    pub fail: bool,
}

impl FakeImages {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(ImageParams, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageProvider for FakeImages {
    async fn generate(
        &self,
        params: &ImageParams,
        credential: Option<&str>,
    ) -> Result<ImageResult, UpstreamError> {
        self.calls
            .lock()
            .unwrap()
            .push((params.clone(), credential.map(String::from)));
        if self.fail {
            return Err(UpstreamError::ApiError {
                status: 400,
                body: "invalid api key".into(),
            });
        }
        Ok(ImageResult {
            b64_json: format!("img:{}", params.prompt),
            timings: ImageTimings { inference: 0.4 },
        })
    }
}

// ---------------------------------------------------------------------------
// App builders
// ---------------------------------------------------------------------------

/// Handles to the fakes behind a test app.
pub struct TestApp {
    pub router: Router,
    pub rewriter: Arc<FakeRewriter>,
    pub images: Arc<FakeImages>,
}

/// Build the full application router with all middleware layers, using the
/// given database pool, no rate limiting and well-behaved upstreams.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(
        pool,
        RateLimiter::disabled(),
        FakeRewriter::default(),
        FakeImages::default(),
    )
    .router
}

/// Build the application router around the given limiter and fakes.
///
/// Goes through `build_app_router` so integration tests exercise the same
/// middleware stack (CORS, request ID, timeout, tracing, panic recovery)
/// that production uses.
pub fn build_test_app_with(
    pool: PgPool,
    limiter: RateLimiter,
    rewriter: FakeRewriter,
    images: FakeImages,
) -> TestApp {
    let config = test_config();
    let rewriter = Arc::new(rewriter);
    let images = Arc::new(images);

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        rewriter: rewriter.clone(),
        images: images.clone(),
        rate_limiter: Arc::new(limiter),
    };

    TestApp {
        router: build_app_router(state, &config),
        rewriter,
        images,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Sign an access token for `user_id` the way the auth provider does.
pub fn bearer_token(user_id: Uuid) -> String {
    let exp = chrono::Utc::now().timestamp() + 3600;
    encode(
        &Header::default(),
        &json!({ "sub": user_id, "role": "authenticated", "exp": exp }),
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("encoding should succeed")
}

pub async fn send(app: Router, request: Request<Body>) -> Response<axum::body::Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::get(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// POST from a specific client address, as a reverse proxy would forward it.
pub async fn post_json_from(
    app: Router,
    uri: &str,
    forwarded_for: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", forwarded_for)
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::put(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::delete(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
