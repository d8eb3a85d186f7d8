//! # mailpuff-core
//!
//! Publishes incoming mail as short-lived, token-protected HTML pages and
//! announces each one in a chat.
//!
//! This crate provides:
//! - An ephemeral content store with TTL and view-limit eviction
//! - A key-correlation cache for compact chat button payloads
//! - Mail summarization, HTML sanitization and notification building
//! - Collaborator traits for mail and chat, with IMAP and Telegram adapters
//! - The ingestion loop, mark-as-read service and chat button listener
//! - An axum router serving `/view` and `/mark_read`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod bridge;
pub mod correlation;
mod error;
pub mod links;
pub mod mail;
pub mod notify;
pub mod sanitize;
pub mod service;
pub mod store;
pub mod summary;
pub mod web;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod testing;

pub use bridge::{Bridge, BridgeConfig};
pub use correlation::CorrelationCache;
pub use error::{AccessDenied, ChatError, CreateError, Error, MailError, Result};
pub use links::LinkBuilder;
pub use mail::{ImapMailSource, ImapSettings, MailSession, MailSource};
pub use notify::{
    Button, ButtonAction, ChatNotifier, Interaction, InteractionSource, MarkAction, Notification,
    NotificationBuilder, TelegramNotifier,
};
pub use sanitize::{AmmoniaSanitizer, Sanitizer};
pub use service::{
    BridgeEvents, IngestSettings, Ingestor, MarkReadOutcome, MarkReadService, PollReport,
    run_listener,
};
pub use store::{
    ContentStore, Dispatcher, NoEvents, NotificationRef, PageEvents, PageId, PageInfo,
    QueueDispatcher, StoreConfig, TerminationReason, Token, TokioDispatcher, ViewOutcome,
};
pub use summary::{MailSummary, summarize};
