//! Error types for the bridge.

use thiserror::Error;

/// Why a page could not be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CreateError {
    /// The raw input was empty.
    #[error("empty html")]
    EmptyInput,

    /// Nothing but whitespace survived sanitization.
    #[error("empty html after sanitization")]
    EmptyContent,
}

/// Why a page read was refused.
///
/// Over HTTP all variants collapse into one 404; the variant only shows up
/// in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessDenied {
    /// No page with that id.
    #[error("page not found")]
    NotFound,

    /// The page exists but the token does not match.
    #[error("invalid token")]
    InvalidToken,

    /// The page outlived its TTL.
    #[error("page expired")]
    Expired,
}

impl AccessDenied {
    /// Short reason used in log fields.
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidToken => "invalid_token",
            Self::Expired => "expired",
        }
    }
}

/// Mail server failure.
#[derive(Debug, Error)]
pub enum MailError {
    /// IMAP protocol or transport error.
    #[error("IMAP error: {0}")]
    Imap(#[from] mailpuff_imap::Error),

    /// Any other mail collaborator failure.
    #[error("mail error: {0}")]
    Other(String),
}

/// Chat delivery failure.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Telegram Bot API error.
    #[error("Telegram error: {0}")]
    Telegram(#[from] mailpuff_telegram::Error),

    /// Any other chat collaborator failure.
    #[error("chat error: {0}")]
    Other(String),
}

/// Errors surfaced while wiring the bridge together.
#[derive(Debug, Error)]
pub enum Error {
    /// Page creation failed.
    #[error(transparent)]
    Create(#[from] CreateError),

    /// Mail collaborator failed.
    #[error(transparent)]
    Mail(#[from] MailError),

    /// Chat collaborator failed.
    #[error(transparent)]
    Chat(#[from] ChatError),

    /// Invalid viewer base URL.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Socket error from the HTTP listener.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
