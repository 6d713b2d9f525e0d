use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dreamer_api::config::{RateLimitStoreKind, ServerConfig};
use dreamer_api::rate_limit::{self, MemoryStore, PgStore, RateLimiter};
use dreamer_api::router::build_app_router;
use dreamer_api::state::AppState;
use dreamer_upstream::chat::ChatRewriter;
use dreamer_upstream::config::{ImageConfig, LlmConfig};
use dreamer_upstream::images::ImageClient;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dreamer_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let llm_config = LlmConfig::from_env();
    let image_config = ImageConfig::from_env();
    tracing::info!(
        llm_model = %llm_config.model,
        image_model = %image_config.model,
        image_base_url = %image_config.effective_base_url(),
        "Loaded upstream configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = dreamer_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    dreamer_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    dreamer_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Upstream clients ---
    let rewriter = Arc::new(ChatRewriter::new(llm_config));
    let images = Arc::new(ImageClient::new(image_config));

    // --- Rate limiter ---
    let policy = config.rate_limit.policy;
    let rate_limiter = Arc::new(match config.rate_limit.store {
        RateLimitStoreKind::Disabled => {
            tracing::info!("Rate limiting disabled (RATE_LIMIT_STORE not set)");
            RateLimiter::disabled()
        }
        RateLimitStoreKind::Memory => {
            tracing::info!(max = policy.max_requests, window_secs = policy.window_secs, "Rate limiting with in-memory store");
            RateLimiter::new(Arc::new(MemoryStore::new()), policy)
        }
        RateLimitStoreKind::Postgres => {
            tracing::info!(max = policy.max_requests, window_secs = policy.window_secs, "Rate limiting with postgres store");
            RateLimiter::new(Arc::new(PgStore::new(pool.clone())), policy)
        }
    });

    // --- Background jobs ---
    let retention_cancel = CancellationToken::new();
    let retention_handle = rate_limiter.is_enabled().then(|| {
        tokio::spawn(rate_limit::retention::run(
            Arc::clone(&rate_limiter),
            retention_cancel.clone(),
        ))
    });

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        rewriter,
        images,
        rate_limiter,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    // Peer addresses feed the rate limiter when no proxy headers are set.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    retention_cancel.cancel();
    if let Some(handle) = retention_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        tracing::info!("Rate limit retention stopped");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
