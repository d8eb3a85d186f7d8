//! # mailpuff-imap
//!
//! A small async IMAP client covering exactly what a mailbox poller needs:
//! log in, select a mailbox, find unseen messages by UID, download them
//! without touching their flags, and mark them `\Seen` later.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailpuff_imap::{Client, Config, Uid, connection};
//!
//! #[tokio::main]
//! async fn main() -> mailpuff_imap::Result<()> {
//!     let config = Config::new("imap.example.com");
//!     let stream = connection::connect(&config).await?;
//!     let client = Client::from_stream(stream).await?;
//!
//!     let client = client.login("user@example.com", "password").await?;
//!     let mut client = client.select("INBOX").await?;
//!
//!     let unseen = client.uid_search("UNSEEN").await?;
//!     for message in client.uid_fetch_bodies(&unseen).await? {
//!         println!("{} -> {} bytes", message.uid, message.body.len());
//!     }
//!     if let Some(first) = unseen.first() {
//!         client.uid_mark_seen(*first).await?;
//!     }
//!
//!     client.logout().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! NotAuthenticated ─── login() ───→ Authenticated ─── select() ───→ Selected
//! ```
//!
//! Each state only exposes the commands that are valid in it.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::{Command, TagGenerator};
pub use connection::{
    Authenticated, Client, Config, FramedStream, ImapStream, NotAuthenticated, Security, Selected,
};
pub use error::{Error, Result};
pub use parser::{FetchedMessage, Response, ResponseParser, UntaggedResponse};
pub use types::{Status, Uid, UidSet};
