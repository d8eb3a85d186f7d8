//! Page data model.

use std::borrow::Borrow;
use std::fmt;

use chrono::{DateTime, Utc};
use mailpuff_imap::Uid;
use tokio::time::Instant;
use uuid::Uuid;

use super::secret::{self, TOKEN_BYTES};

/// Public handle of a page (UUID v4 text form).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(String);

impl PageId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Full identifier, as used in URLs.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier shortened for logs.
    #[must_use]
    pub fn masked(&self) -> String {
        secret::mask(&self.0)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PageId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Secret that must accompany a [`PageId`] on every read.
///
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub(crate) fn generate() -> Self {
        Self(secret::random_urlsafe(TOKEN_BYTES))
    }

    /// Raw token, for building links.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against a presented value.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        !candidate.is_empty() && secret::constant_time_eq(self.0.as_bytes(), candidate.as_bytes())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Where a chat notification lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationRef {
    /// Chat the message was posted to.
    pub chat_id: i64,
    /// Message identifier within the chat.
    pub message_id: i64,
}

/// What ended a page's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// TTL ran out.
    Expired,
    /// The last allowed view was served.
    ViewLimitReached,
    /// Removed explicitly.
    Manual,
}

impl TerminationReason {
    /// Short reason used in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::ViewLimitReached => "max_views",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`ContentStore::view`](super::ContentStore::view).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOutcome {
    /// The sanitized content.
    Served(String),
    /// No such page.
    NotFound,
    /// Token mismatch or empty token.
    InvalidToken,
    /// The page was past its TTL and has been evicted.
    Expired,
}

/// Snapshot of a page's metadata, without its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    /// Public handle.
    pub id: PageId,
    /// Access secret.
    pub token: Token,
    /// Wall-clock creation time.
    pub created_at: DateTime<Utc>,
    /// Wall-clock expiry time.
    pub expires_at: DateTime<Utc>,
    /// View limit; 0 means unlimited.
    pub max_views: u32,
    /// Views served so far.
    pub views: u32,
    /// Chat message announcing the page, once sent.
    pub notification: Option<NotificationRef>,
    /// Mail message the page was rendered from, once attached.
    pub mail_uid: Option<Uid>,
}

pub(crate) struct Page {
    pub(crate) info: PageInfo,
    pub(crate) content: String,
    pub(crate) deadline: Instant,
}

impl Page {
    /// A page is visible strictly before its deadline.
    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    pub(crate) const fn limit_reached(&self) -> bool {
        self.info.max_views > 0 && self.info.views >= self.info.max_views
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_is_uuid_v4() {
        let id = PageId::generate();
        let parsed = Uuid::parse_str(id.as_str()).unwrap_or_default();
        assert_eq!(parsed.get_version_num(), 4);
        assert_ne!(id, PageId::generate());
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = Token::generate();
        let debug = format!("{token:?}");
        assert!(!debug.contains(token.expose()));
    }

    #[test]
    fn test_token_matches() {
        let token = Token::from("s3cr3t-token");
        assert!(token.matches("s3cr3t-token"));
        assert!(!token.matches("s3cr3t-tokeN"));
        assert!(!token.matches(""));
    }

    #[test]
    fn test_termination_reason_labels() {
        assert_eq!(TerminationReason::Expired.to_string(), "expired");
        assert_eq!(TerminationReason::ViewLimitReached.to_string(), "max_views");
        assert_eq!(TerminationReason::Manual.to_string(), "manual");
    }
}
