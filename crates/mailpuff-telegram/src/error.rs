//! Error types for Bot API calls.

/// Result type alias for Bot API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Bot API error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport or HTTP-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The Bot API answered `ok: false`.
    #[error("Bot API error {code}: {description}")]
    Api {
        /// Numeric error code (mirrors the HTTP status).
        code: i32,
        /// Human-readable description.
        description: String,
    },

    /// `ok: true` without a `result` field.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// URL construction error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Creates an API error from code and description.
    #[must_use]
    pub fn api(code: i32, description: impl Into<String>) -> Self {
        Self::Api {
            code,
            description: description.into(),
        }
    }

    /// Whether the message targeted by an edit no longer changes.
    ///
    /// Telegram rejects edits that leave the markup identical; callers
    /// usually treat that as success.
    #[must_use]
    pub fn is_not_modified(&self) -> bool {
        matches!(self, Self::Api { description, .. } if description.contains("message is not modified"))
    }
}
