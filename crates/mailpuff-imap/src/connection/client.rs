//! Type-state IMAP client.
//!
//! ```text
//! NotAuthenticated ─── login() ───→ Authenticated ─── select() ───→ Selected
//! ```
//!
//! Each state only exposes the commands that are valid in it. Every command
//! waits for its tagged completion, bounded by the configured I/O timeout.

#![allow(clippy::missing_errors_doc)]

use std::marker::PhantomData;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use super::framed::FramedStream;
use crate::command::{Command, TagGenerator};
use crate::parser::{FetchedMessage, Response, ResponseParser, UntaggedResponse};
use crate::types::{Status, Uid, UidSet};
use crate::{Error, Result};

/// Marker: connected, not logged in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Marker: logged in, no mailbox selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// Marker: a mailbox is selected read-write.
#[derive(Debug, Clone, Copy, Default)]
pub struct Selected;

/// IMAP client connection; `State` tracks the protocol state.
pub struct Client<S, State> {
    stream: FramedStream<S>,
    tags: TagGenerator,
    capabilities: Vec<String>,
    io_timeout: Duration,
    _state: PhantomData<State>,
}

impl<S, State> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tags", &self.tags)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Capabilities advertised in the greeting or after login.
    #[must_use]
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Overrides how long a command may wait for its completion.
    #[must_use]
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Sends LOGOUT and drops the connection.
    ///
    /// The server answers with `* BYE` before the tagged OK; both are fine.
    pub async fn logout(mut self) -> Result<()> {
        match self.run(&Command::Logout).await {
            Ok(_) | Err(Error::Bye(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Sends a command, collects its responses and checks the completion.
    async fn run(&mut self, command: &Command) -> Result<Vec<Response>> {
        let tag = self.tags.next();
        let bytes = command.serialize(&tag)?;
        self.stream.write_command(&bytes).await?;

        let raw = tokio::time::timeout(self.io_timeout, self.stream.read_until_tagged(&tag))
            .await
            .map_err(|_| Error::Timeout(self.io_timeout))??;

        let mut responses = Vec::with_capacity(raw.len());
        for bytes in &raw {
            match ResponseParser::parse(bytes) {
                Ok(response) => responses.push(response),
                Err(e) => tracing::debug!(error = %e, "skipping unparsable response"),
            }
        }
        check_tagged_ok(&responses, &tag)?;
        Ok(responses)
    }

    fn into_state<Next>(self) -> Client<S, Next> {
        Client {
            stream: self.stream,
            tags: self.tags,
            capabilities: self.capabilities,
            io_timeout: self.io_timeout,
            _state: PhantomData,
        }
    }
}

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected stream and reads the server greeting.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut framed = FramedStream::new(stream);
        let greeting = framed.read_response().await?;

        let capabilities = match ResponseParser::parse(&greeting)? {
            Response::Untagged(UntaggedResponse::Condition {
                status: Status::Bye,
                text,
            }) => return Err(Error::Bye(text)),
            Response::Untagged(UntaggedResponse::Condition { text, .. }) => {
                capabilities_from_code(&text)
            }
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        };

        Ok(Self {
            stream: framed,
            tags: TagGenerator::default(),
            capabilities,
            io_timeout: Duration::from_secs(120),
            _state: PhantomData,
        })
    }

    /// Authenticates with LOGIN.
    pub async fn login(mut self, username: &str, password: &str) -> Result<Client<S, Authenticated>> {
        let responses = self
            .run(&Command::Login {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;

        // Servers send capabilities either untagged or as a response code.
        for response in &responses {
            match response {
                Response::Untagged(UntaggedResponse::Capability(caps)) => {
                    self.capabilities.clone_from(caps);
                }
                Response::Tagged { text, .. } => {
                    let caps = capabilities_from_code(text);
                    if !caps.is_empty() {
                        self.capabilities = caps;
                    }
                }
                _ => {}
            }
        }

        Ok(self.into_state())
    }
}

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a mailbox read-write.
    ///
    /// Read-write matters: flags can only be stored in a selected mailbox.
    pub async fn select(mut self, mailbox: &str) -> Result<Client<S, Selected>> {
        self.run(&Command::Select {
            mailbox: mailbox.to_string(),
        })
        .await?;
        Ok(self.into_state())
    }
}

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Runs `UID SEARCH` with raw criteria such as `UNSEEN`.
    pub async fn uid_search(&mut self, criteria: &str) -> Result<Vec<Uid>> {
        let responses = self
            .run(&Command::UidSearch {
                criteria: criteria.to_string(),
            })
            .await?;

        let mut uids = Vec::new();
        for response in responses {
            if let Response::Untagged(UntaggedResponse::Search(found)) = response {
                uids.extend(found);
            }
        }
        uids.sort_unstable();
        uids.dedup();
        Ok(uids)
    }

    /// Downloads full messages without setting `\Seen`.
    ///
    /// UIDs that no longer exist are silently absent from the result.
    pub async fn uid_fetch_bodies(&mut self, uids: &[Uid]) -> Result<Vec<FetchedMessage>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let responses = self
            .run(&Command::UidFetchBody {
                uids: UidSet::new(uids.iter().copied()),
            })
            .await?;

        Ok(responses
            .into_iter()
            .filter_map(|response| match response {
                Response::Untagged(UntaggedResponse::Fetch { data, .. }) => data.into_message(),
                _ => None,
            })
            .collect())
    }

    /// Adds `\Seen` to one message.
    pub async fn uid_mark_seen(&mut self, uid: Uid) -> Result<()> {
        self.run(&Command::UidMarkSeen {
            uids: UidSet::single(uid),
        })
        .await
        .map(drop)
    }
}

fn check_tagged_ok(responses: &[Response], tag: &str) -> Result<()> {
    for response in responses.iter().rev() {
        if let Response::Tagged {
            tag: resp_tag,
            status,
            text,
        } = response
            && resp_tag == tag
        {
            return match status {
                Status::Ok | Status::PreAuth => Ok(()),
                Status::No => Err(Error::No(text.clone())),
                Status::Bad => Err(Error::Bad(text.clone())),
                Status::Bye => Err(Error::Bye(text.clone())),
            };
        }
    }

    // LOGOUT completes after `* BYE`; surface the BYE when the tag is missing.
    for response in responses {
        if let Response::Untagged(UntaggedResponse::Condition {
            status: Status::Bye,
            text,
        }) = response
        {
            return Err(Error::Bye(text.clone()));
        }
    }

    Err(Error::Protocol("missing tagged response".to_string()))
}

/// Extracts `[CAPABILITY ...]` from a greeting text.
fn capabilities_from_code(text: &str) -> Vec<String> {
    text.strip_prefix("[CAPABILITY ")
        .and_then(|rest| rest.split_once(']'))
        .map(|(caps, _)| caps.split_ascii_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}
