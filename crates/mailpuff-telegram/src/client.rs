//! Bot API client.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};
use crate::types::{ApiResponse, InlineKeyboardMarkup, Message, SendMessage, Update};

const DEFAULT_API_URL: &str = "https://api.telegram.org/";

/// Requests other than long polls give up after this long.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Telegram bot bound to one token.
#[derive(Clone)]
pub struct Bot {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct EditReplyMarkup<'a> {
    chat_id: i64,
    message_id: i64,
    reply_markup: &'a InlineKeyboardMarkup,
}

#[derive(Serialize)]
struct AnswerCallbackQuery<'a> {
    callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Serialize)]
struct GetUpdates<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u32,
    allowed_updates: &'a [&'a str],
}

impl Bot {
    /// Creates a bot talking to `api.telegram.org`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: DEFAULT_API_URL.to_string(),
            token: token.into(),
        }
    }

    /// Points the bot at another API server (self-hosted or a test double).
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        let mut url = Url::parse(base_url)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.base_url = url.into();
        Ok(self)
    }

    /// Sends a text message.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an API rejection.
    pub async fn send_message(&self, request: &SendMessage) -> Result<Message> {
        self.call("sendMessage", request, REQUEST_TIMEOUT).await
    }

    /// Replaces the inline keyboard of a sent message.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an API rejection.
    pub async fn edit_message_reply_markup(
        &self,
        chat_id: i64,
        message_id: i64,
        markup: &InlineKeyboardMarkup,
    ) -> Result<()> {
        let params = EditReplyMarkup {
            chat_id,
            message_id,
            reply_markup: markup,
        };
        // The result is the edited message, or `true` for inline messages.
        self.call::<_, serde_json::Value>("editMessageReplyMarkup", &params, REQUEST_TIMEOUT)
            .await
            .map(drop)
    }

    /// Answers a callback query, optionally showing a toast.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an API rejection.
    pub async fn answer_callback_query(&self, id: &str, text: Option<&str>) -> Result<()> {
        let params = AnswerCallbackQuery {
            callback_query_id: id,
            text,
        };
        self.call::<_, bool>("answerCallbackQuery", &params, REQUEST_TIMEOUT)
            .await
            .map(drop)
    }

    /// Long-polls for callback-query updates.
    ///
    /// `offset` should be one past the last seen `update_id`; the server
    /// holds the request open for up to `timeout_secs`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an API rejection.
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u32) -> Result<Vec<Update>> {
        let params = GetUpdates {
            offset,
            timeout: timeout_secs,
            allowed_updates: &["callback_query"],
        };
        let deadline = REQUEST_TIMEOUT + Duration::from_secs(u64::from(timeout_secs));
        self.call("getUpdates", &params, deadline).await
    }

    async fn call<P, R>(&self, method: &str, params: &P, timeout: Duration) -> Result<R>
    where
        P: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = Url::parse(&self.base_url)?.join(&format!("bot{}/{method}", self.token))?;

        let response = self
            .http_client
            .post(url)
            .json(params)
            .timeout(timeout)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        // Rejections come back as non-2xx with the same JSON envelope.
        let status = response.status();
        let body = response.bytes().await.map_err(reqwest::Error::without_url)?;
        let envelope: ApiResponse<R> = serde_json::from_slice(&body)?;

        if !envelope.ok {
            let code = envelope
                .error_code
                .unwrap_or_else(|| i32::from(status.as_u16()));
            let description = envelope.description.unwrap_or_default();
            tracing::debug!(method, code, %description, "bot api call rejected");
            return Err(Error::api(code, description));
        }

        envelope
            .result
            .ok_or_else(|| Error::InvalidResponse(format!("{method}: missing result")))
    }
}
