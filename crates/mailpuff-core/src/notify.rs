//! Chat notifications and the chat collaborator.

use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use mailpuff_telegram::{Bot, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode, SendMessage};

use crate::error::ChatError;
use crate::links::LinkBuilder;
use crate::store::{NotificationRef, PageId, Token};
use crate::summary::MailSummary;

/// Callback payload prefix of the mark-as-read button.
pub const MARK_CALLBACK_PREFIX: &str = "mark:";

/// What pressing a button does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    /// Opens a URL.
    Url(String),
    /// Sends a payload back to the bot.
    Callback(String),
}

/// Inline button under a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Label.
    pub label: String,
    /// Press behaviour.
    pub action: ButtonAction,
}

impl Button {
    /// URL button.
    #[must_use]
    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }

    /// Callback button.
    #[must_use]
    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }
}

/// A message to post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Destination chat.
    pub chat_id: i64,
    /// HTML-formatted text; every interpolated field is escaped.
    pub text: String,
    /// Buttons, in display order.
    pub buttons: Vec<Button>,
}

/// How the mark-as-read action is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkAction {
    /// Not offered.
    Off,
    /// Callback button resolved through an interaction key.
    #[default]
    Button,
    /// URL button pointing at `/mark_read`.
    Link,
}

impl FromStr for MarkAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::Off),
            "button" => Ok(Self::Button),
            "link" => Ok(Self::Link),
            other => Err(format!(
                "unknown mark action '{other}' (expected none, button or link)"
            )),
        }
    }
}

/// Builds notifications and keyboards for one chat.
#[derive(Debug, Clone)]
pub struct NotificationBuilder {
    chat_id: i64,
    links: LinkBuilder,
    mark_action: MarkAction,
}

impl NotificationBuilder {
    /// Creates a builder.
    #[must_use]
    pub const fn new(chat_id: i64, links: LinkBuilder, mark_action: MarkAction) -> Self {
        Self {
            chat_id,
            links,
            mark_action,
        }
    }

    /// Configured mark action style.
    #[must_use]
    pub const fn mark_action(&self) -> MarkAction {
        self.mark_action
    }

    /// Link builder in use.
    #[must_use]
    pub const fn links(&self) -> &LinkBuilder {
        &self.links
    }

    /// Announcement for a freshly published page.
    ///
    /// `key` is the interaction key for [`MarkAction::Button`]; without one
    /// that style degrades to no mark button.
    #[must_use]
    pub fn build(
        &self,
        summary: &MailSummary,
        id: &PageId,
        token: &Token,
        key: Option<&str>,
    ) -> Notification {
        let mut buttons = vec![Button::url(
            "Open secure preview",
            self.links.view_url(id, token),
        )];
        match (self.mark_action, key) {
            (MarkAction::Button, Some(key)) => buttons.push(Button::callback(
                "Mark as read",
                format!("{MARK_CALLBACK_PREFIX}{key}"),
            )),
            (MarkAction::Link, _) => {
                buttons.push(Button::url("Mark as read", self.links.mark_url(id, token)));
            }
            _ => {}
        }

        Notification {
            chat_id: self.chat_id,
            text: message_text(summary),
            buttons,
        }
    }

    /// Keyboard left once the mail has been marked read.
    #[must_use]
    pub fn view_only(&self, id: &PageId, token: &Token) -> Vec<Button> {
        vec![Button::url("Open html", self.links.view_url(id, token))]
    }
}

/// Notification body in chat HTML.
#[must_use]
pub fn message_text(summary: &MailSummary) -> String {
    let from_name = non_empty_or(&summary.from_name, "Unknown sender");
    let from_address = non_empty_or(&summary.from_address, "unknown@unknown");
    format!(
        "{}\n{}\n\nA new email has arrived from this address: {}\n\n\u{1f310} A secret HTML page has been created for it, where you can preview the message by following the link below \u{1f447}",
        html_escape::encode_text(&summary.subject),
        html_escape::encode_text(from_name),
        html_escape::encode_text(from_address),
    )
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// A button press reported by the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    /// Identifier to acknowledge.
    pub id: String,
    /// Callback payload.
    pub data: String,
    /// Message the pressed keyboard belongs to.
    pub origin: Option<NotificationRef>,
}

/// Chat collaborator.
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    /// Posts a notification.
    async fn send_notification(
        &self,
        notification: &Notification,
    ) -> Result<NotificationRef, ChatError>;

    /// Replaces the buttons under a posted notification.
    async fn update_buttons(
        &self,
        target: NotificationRef,
        buttons: &[Button],
    ) -> Result<(), ChatError>;

    /// Answers a button press with a short toast.
    async fn acknowledge_interaction(&self, interaction_id: &str, text: &str)
    -> Result<(), ChatError>;
}

/// Source of button presses.
#[async_trait]
pub trait InteractionSource: Send + Sync {
    /// Waits for the next batch of presses; may return an empty batch.
    async fn next_interactions(&self) -> Result<Vec<Interaction>, ChatError>;
}

/// Telegram adapter for [`ChatNotifier`] and [`InteractionSource`].
#[derive(Debug)]
pub struct TelegramNotifier {
    bot: Bot,
    offset: AtomicI64,
}

/// Seconds one `getUpdates` call may wait.
const LONG_POLL_SECS: u32 = 50;

impl TelegramNotifier {
    /// Wraps a bot.
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self {
            bot,
            offset: AtomicI64::new(0),
        }
    }
}

fn keyboard(buttons: &[Button]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::row(buttons.iter().map(|button| match &button.action {
        ButtonAction::Url(url) => InlineKeyboardButton::url(&button.label, url),
        ButtonAction::Callback(data) => InlineKeyboardButton::callback(&button.label, data),
    }))
}

#[async_trait]
impl ChatNotifier for TelegramNotifier {
    async fn send_notification(
        &self,
        notification: &Notification,
    ) -> Result<NotificationRef, ChatError> {
        let request = SendMessage::new(notification.chat_id, &notification.text)
            .parse_mode(ParseMode::Html)
            .without_link_preview()
            .reply_markup(keyboard(&notification.buttons));
        let sent = self.bot.send_message(&request).await?;
        Ok(NotificationRef {
            chat_id: sent.chat.id,
            message_id: sent.message_id,
        })
    }

    async fn update_buttons(
        &self,
        target: NotificationRef,
        buttons: &[Button],
    ) -> Result<(), ChatError> {
        match self
            .bot
            .edit_message_reply_markup(target.chat_id, target.message_id, &keyboard(buttons))
            .await
        {
            Err(e) if e.is_not_modified() => Ok(()),
            other => other.map_err(Into::into),
        }
    }

    async fn acknowledge_interaction(
        &self,
        interaction_id: &str,
        text: &str,
    ) -> Result<(), ChatError> {
        self.bot
            .answer_callback_query(interaction_id, Some(text))
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl InteractionSource for TelegramNotifier {
    async fn next_interactions(&self) -> Result<Vec<Interaction>, ChatError> {
        let offset = match self.offset.load(Ordering::Acquire) {
            0 => None,
            n => Some(n),
        };
        let updates = self.bot.get_updates(offset, LONG_POLL_SECS).await?;

        let mut interactions = Vec::new();
        for update in updates {
            self.offset.fetch_max(update.update_id + 1, Ordering::AcqRel);
            let Some(query) = update.callback_query else {
                continue;
            };
            interactions.push(Interaction {
                id: query.id,
                data: query.data.unwrap_or_default(),
                origin: query.message.map(|message| NotificationRef {
                    chat_id: message.chat.id,
                    message_id: message.message_id,
                }),
            });
        }
        Ok(interactions)
    }
}
