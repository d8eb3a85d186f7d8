//! Bot API object types.
//!
//! Only the fields this crate reads or writes are modelled; unknown fields
//! are ignored on deserialization.

use serde::{Deserialize, Serialize};

/// Envelope every Bot API method answers with.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Payload on success.
    pub result: Option<T>,
    /// Error description on failure.
    pub description: Option<String>,
    /// Error code on failure.
    pub error_code: Option<i32>,
}

/// Incoming update from `getUpdates`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Update {
    /// Monotonic update identifier.
    pub update_id: i64,
    /// New incoming message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// Inline keyboard button press.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<CallbackQuery>,
}

/// Inline keyboard button press.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CallbackQuery {
    /// Identifier to pass to `answerCallbackQuery`.
    pub id: String,
    /// User who pressed the button.
    pub from: User,
    /// Message the keyboard was attached to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// Callback payload of the button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Telegram user or bot.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct User {
    /// Unique identifier.
    pub id: i64,
    /// Whether this is a bot.
    #[serde(default)]
    pub is_bot: bool,
    /// First name.
    #[serde(default)]
    pub first_name: String,
    /// Username without `@`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Chat message.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Message {
    /// Identifier unique within the chat.
    pub message_id: i64,
    /// Chat the message belongs to.
    pub chat: Chat,
    /// Unix time the message was sent.
    #[serde(default)]
    pub date: i64,
    /// Text for text messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Chat.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Chat {
    /// Unique identifier; negative for groups and channels.
    pub id: i64,
    /// `private`, `group`, `supergroup` or `channel`.
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Inline keyboard attached to a message.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct InlineKeyboardMarkup {
    /// Rows of buttons.
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    /// One button per row.
    #[must_use]
    pub fn column(buttons: impl IntoIterator<Item = InlineKeyboardButton>) -> Self {
        Self {
            inline_keyboard: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    /// All buttons in one row.
    #[must_use]
    pub fn row(buttons: impl IntoIterator<Item = InlineKeyboardButton>) -> Self {
        Self {
            inline_keyboard: vec![buttons.into_iter().collect()],
        }
    }
}

/// Inline keyboard button; exactly one of `url` and `callback_data` is set.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct InlineKeyboardButton {
    /// Label.
    pub text: String,
    /// URL opened on press.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Payload sent back in a callback query (1-64 bytes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
}

impl InlineKeyboardButton {
    /// Button opening a URL.
    #[must_use]
    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: Some(url.into()),
            callback_data: None,
        }
    }

    /// Button producing a callback query.
    #[must_use]
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: None,
            callback_data: Some(data.into()),
        }
    }
}

/// Text formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    /// HTML subset.
    #[serde(rename = "HTML")]
    Html,
    /// `MarkdownV2`.
    MarkdownV2,
}

/// Link preview settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkPreviewOptions {
    /// Disable the preview entirely.
    pub is_disabled: bool,
}

/// Parameters of `sendMessage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendMessage {
    /// Destination chat.
    pub chat_id: i64,
    /// Message text.
    pub text: String,
    /// Formatting mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    /// Link preview settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_preview_options: Option<LinkPreviewOptions>,
    /// Inline keyboard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

impl SendMessage {
    /// Plain message to a chat.
    #[must_use]
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            parse_mode: None,
            link_preview_options: None,
            reply_markup: None,
        }
    }

    /// Sets the parse mode.
    #[must_use]
    pub const fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    /// Disables link previews.
    #[must_use]
    pub const fn without_link_preview(mut self) -> Self {
        self.link_preview_options = Some(LinkPreviewOptions { is_disabled: true });
        self
    }

    /// Attaches an inline keyboard.
    #[must_use]
    pub fn reply_markup(mut self, markup: InlineKeyboardMarkup) -> Self {
        self.reply_markup = Some(markup);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_callback_update() {
        let json = r#"{
            "update_id": 918273,
            "callback_query": {
                "id": "4382bfdwdsb323b2d9",
                "from": {"id": 1111, "is_bot": false, "first_name": "Ann", "language_code": "en"},
                "message": {
                    "message_id": 77,
                    "chat": {"id": -100123, "type": "supergroup", "title": "mail"},
                    "date": 1700000000,
                    "text": "Subject"
                },
                "chat_instance": "-1",
                "data": "mark:AbCdEfGhIjKl"
            }
        }"#;

        let update: Update = serde_json::from_str(json).unwrap();
        assert_eq!(update.update_id, 918_273);
        let query = update.callback_query.unwrap();
        assert_eq!(query.data.as_deref(), Some("mark:AbCdEfGhIjKl"));
        let message = query.message.unwrap();
        assert_eq!(message.chat.id, -100_123);
        assert_eq!(message.chat.kind, "supergroup");
        assert_eq!(message.message_id, 77);
    }

    #[test]
    fn test_serialize_send_message() {
        let markup = InlineKeyboardMarkup::column([
            InlineKeyboardButton::url("Open", "https://example.com/view?id=1"),
            InlineKeyboardButton::callback("Mark", "mark:k"),
        ]);
        let request = SendMessage::new(42, "<b>hi</b>")
            .parse_mode(ParseMode::Html)
            .without_link_preview()
            .reply_markup(markup);

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["chat_id"], 42);
        assert_eq!(value["parse_mode"], "HTML");
        assert_eq!(value["link_preview_options"]["is_disabled"], true);
        let rows = value["reply_markup"]["inline_keyboard"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0]["url"], "https://example.com/view?id=1");
        assert!(rows[0][0].get("callback_data").is_none());
        assert_eq!(rows[1][0]["callback_data"], "mark:k");
    }

    #[test]
    fn test_plain_message_omits_optional_fields() {
        let value = serde_json::to_value(SendMessage::new(1, "x")).unwrap();
        assert!(value.get("parse_mode").is_none());
        assert!(value.get("reply_markup").is_none());
    }

    #[test]
    fn test_error_envelope() {
        let json = r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#;
        let response: ApiResponse<Message> = serde_json::from_str(json).unwrap();
        assert!(!response.ok);
        assert!(response.result.is_none());
        assert_eq!(response.error_code, Some(400));
    }
}
