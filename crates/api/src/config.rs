use dreamer_core::rate_limit::{WindowPolicy, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_SECS};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. Upstream endpoints are configured separately through
/// `dreamer_upstream::config`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `60`). Image generation
    /// routinely takes several seconds, so this is longer than usual.
    pub request_timeout_secs: u64,
    /// JWT validation settings for journal routes.
    pub jwt: JwtConfig,
    /// Anonymous quota settings.
    pub rate_limit: RateLimitConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `60`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
        }
    }
}

/// Which backing store counts anonymous requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitStoreKind {
    /// No store configured: the limiter is a no-op.
    Disabled,
    /// In-process map. Counts are lost on restart and not shared between
    /// instances.
    Memory,
    /// The `rate_limit_windows` table.
    Postgres,
}

impl RateLimitStoreKind {
    /// Parse the `RATE_LIMIT_STORE` value. Empty means disabled.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "disabled" => Some(Self::Disabled),
            "memory" => Some(Self::Memory),
            "postgres" => Some(Self::Postgres),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub store: RateLimitStoreKind,
    pub policy: WindowPolicy,
}

impl RateLimitConfig {
    /// Load rate-limit settings from environment variables.
    ///
    /// | Env Var                   | Default  |
    /// |---------------------------|----------|
    /// | `RATE_LIMIT_STORE`        | unset    |
    /// | `RATE_LIMIT_MAX_REQUESTS` | `100`    |
    /// | `RATE_LIMIT_WINDOW_SECS`  | `86400`  |
    ///
    /// # Panics
    ///
    /// Panics on an unknown store name or a zero quota/window.
    pub fn from_env() -> Self {
        let raw_store = std::env::var("RATE_LIMIT_STORE").unwrap_or_default();
        let store = RateLimitStoreKind::parse(&raw_store).unwrap_or_else(|| {
            panic!("RATE_LIMIT_STORE must be 'memory' or 'postgres', got '{raw_store}'")
        });

        let max_requests: u32 = std::env::var("RATE_LIMIT_MAX_REQUESTS")
            .unwrap_or_else(|_| DEFAULT_MAX_REQUESTS.to_string())
            .parse()
            .expect("RATE_LIMIT_MAX_REQUESTS must be a valid u32");

        let window_secs: u64 = std::env::var("RATE_LIMIT_WINDOW_SECS")
            .unwrap_or_else(|_| DEFAULT_WINDOW_SECS.to_string())
            .parse()
            .expect("RATE_LIMIT_WINDOW_SECS must be a valid u64");

        let policy = WindowPolicy::new(max_requests, window_secs)
            .unwrap_or_else(|e| panic!("Invalid rate limit policy: {e}"));

        Self { store, policy }
    }

    /// Limiter turned off, default policy.
    pub fn disabled() -> Self {
        Self {
            store: RateLimitStoreKind::Disabled,
            policy: WindowPolicy::default(),
        }
    }
}
