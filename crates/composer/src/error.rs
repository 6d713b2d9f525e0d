use dreamer_core::generation::ErrorBody;

/// Errors surfaced by the composer and its transports.
///
/// None of these are fatal: every failure leaves the session in a stable,
/// re-editable state.
#[derive(Debug, thiserror::Error)]
pub enum ComposerError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The proxy returned a non-2xx status code.
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body, never swallowed.
        body: String,
    },

    /// The anonymous quota is exhausted.
    #[error("{message}")]
    RateLimited {
        message: String,
        /// Value of `X-RateLimit-Remaining`, when the proxy sent it.
        remaining: Option<u32>,
    },

    /// `accept()`/`reject()` called with nothing to decide on.
    #[error("No prompt suggestion is waiting for a decision")]
    NoPendingDecision,

    /// `select()` called with an index outside the history.
    #[error("History index {index} is out of range (history has {len} entries)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Journal save requested without an active generation.
    #[error("There is no active generation to save")]
    NothingToSave,
}

impl ComposerError {
    /// Short text suitable for a toast.
    ///
    /// API errors carrying the proxy's JSON envelope are reduced to its
    /// `error` field; anything else falls back to the full display string.
    pub fn user_message(&self) -> String {
        match self {
            ComposerError::Api { body, .. } => serde_json::from_str::<ErrorBody>(body)
                .map(|b| b.error)
                .unwrap_or_else(|_| body.clone()),
            ComposerError::RateLimited { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
