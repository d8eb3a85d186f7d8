//! Mail collaborator and its IMAP adapter.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use mailpuff_imap::connection::{self, Client, ImapStream, Selected};
use mailpuff_imap::{Config, Security, Uid};

use crate::error::MailError;

/// An open, mailbox-selected session.
#[async_trait]
pub trait MailSession: Send {
    /// UIDs of messages without `\Seen`.
    async fn list_unseen(&mut self) -> Result<Vec<Uid>, MailError>;

    /// Raw messages by UID; fetching must not set `\Seen`.
    async fn fetch(&mut self, uids: &[Uid]) -> Result<BTreeMap<Uid, Vec<u8>>, MailError>;

    /// Sets `\Seen` on one message.
    async fn mark_seen(&mut self, uid: Uid) -> Result<(), MailError>;

    /// Ends the session.
    async fn close(self: Box<Self>) -> Result<(), MailError>;
}

/// Opens mail sessions.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Connects, authenticates and selects the mailbox.
    async fn connect(&self) -> Result<Box<dyn MailSession>, MailError>;

    /// One-shot: connect, mark one message seen, close.
    async fn mark_seen(&self, uid: Uid) -> Result<(), MailError> {
        let mut session = self.connect().await?;
        let result = session.mark_seen(uid).await;
        if let Err(e) = session.close().await {
            tracing::debug!(error = %e, "closing mail session failed");
        }
        result
    }
}

/// IMAP connection settings.
#[derive(Clone)]
pub struct ImapSettings {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Implicit TLS when true, plain TCP otherwise.
    pub tls: bool,
    /// Login name.
    pub username: String,
    /// Password.
    pub password: String,
    /// Mailbox to select.
    pub mailbox: String,
    /// TCP + TLS setup limit.
    pub connect_timeout: Duration,
    /// Per-command limit.
    pub io_timeout: Duration,
}

impl std::fmt::Debug for ImapSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("mailbox", &self.mailbox)
            .finish_non_exhaustive()
    }
}

impl ImapSettings {
    fn connection_config(&self) -> Config {
        let security = if self.tls {
            Security::Implicit
        } else {
            Security::None
        };
        Config::new(&self.host)
            .with_port(self.port)
            .with_security(security)
            .with_timeouts(self.connect_timeout, self.io_timeout)
    }
}

/// [`MailSource`] over IMAP; one connection per session.
#[derive(Debug, Clone)]
pub struct ImapMailSource {
    settings: ImapSettings,
}

impl ImapMailSource {
    /// Creates a source.
    #[must_use]
    pub const fn new(settings: ImapSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl MailSource for ImapMailSource {
    async fn connect(&self) -> Result<Box<dyn MailSession>, MailError> {
        let settings = &self.settings;
        let stream = connection::connect(&settings.connection_config()).await?;
        let tls = stream.is_tls();
        let client = Client::from_stream(stream)
            .await?
            .with_io_timeout(settings.io_timeout);
        let client = client
            .login(&settings.username, &settings.password)
            .await?;
        let client = client.select(&settings.mailbox).await?;
        tracing::debug!(
            host = %settings.host,
            mailbox = %settings.mailbox,
            tls,
            capabilities = ?client.capabilities(),
            "imap session open"
        );
        Ok(Box::new(ImapSession { client }))
    }
}

struct ImapSession {
    client: Client<ImapStream, Selected>,
}

#[async_trait]
impl MailSession for ImapSession {
    async fn list_unseen(&mut self) -> Result<Vec<Uid>, MailError> {
        Ok(self.client.uid_search("UNSEEN").await?)
    }

    async fn fetch(&mut self, uids: &[Uid]) -> Result<BTreeMap<Uid, Vec<u8>>, MailError> {
        let messages = self.client.uid_fetch_bodies(uids).await?;
        Ok(messages
            .into_iter()
            .map(|message| (message.uid, message.body))
            .collect())
    }

    async fn mark_seen(&mut self, uid: Uid) -> Result<(), MailError> {
        Ok(self.client.uid_mark_seen(uid).await?)
    }

    async fn close(self: Box<Self>) -> Result<(), MailError> {
        Ok(self.client.logout().await?)
    }
}
