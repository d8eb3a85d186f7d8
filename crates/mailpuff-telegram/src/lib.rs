//! # mailpuff-telegram
//!
//! The slice of the Telegram Bot API a notification bridge needs: send a
//! message with an inline keyboard, swap that keyboard later, answer button
//! presses and long-poll for them.
//!
//! ```ignore
//! use mailpuff_telegram::{Bot, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode, SendMessage};
//!
//! let bot = Bot::new(std::env::var("TELEGRAM_TOKEN")?);
//! let sent = bot
//!     .send_message(
//!         &SendMessage::new(chat_id, "<b>New mail</b>")
//!             .parse_mode(ParseMode::Html)
//!             .reply_markup(InlineKeyboardMarkup::column([
//!                 InlineKeyboardButton::url("Open", "https://example.com/view"),
//!             ])),
//!     )
//!     .await?;
//! ```
//!
//! The bot token is part of every request URL; it is kept out of `Debug`
//! output and stripped from transport errors.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod error;
pub mod types;

pub use client::Bot;
pub use error::{Error, Result};
pub use types::{
    CallbackQuery, Chat, InlineKeyboardButton, InlineKeyboardMarkup, Message, ParseMode,
    SendMessage, Update, User,
};
