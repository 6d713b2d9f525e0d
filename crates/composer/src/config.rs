use std::time::Duration;

use crate::debounce::DEFAULT_QUIET_PERIOD;

/// Default proxy base URL (the API server's `/api/v1` mount).
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api/v1";

/// Composer configuration.
///
/// Constructed once per session; read-only afterwards.
#[derive(Debug, Clone)]
pub struct ComposerConfig {
    /// Quiet period before an edit is considered settled.
    pub quiet_period: Duration,
    /// Base URL of the backend proxy, without a trailing slash.
    pub api_base_url: String,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl ComposerConfig {
    /// Point the composer at a different proxy.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the debounce quiet period.
    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period = quiet_period;
        self
    }
}
