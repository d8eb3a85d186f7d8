//! Integration tests for the IMAP client.
//!
//! A mock stream replays a scripted server conversation and records what
//! the client sent.

use std::io::{self, Cursor};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use mailpuff_imap::{Client, Error, ResponseParser, Response, Status, Uid};

/// Mock stream that returns predefined responses.
struct MockStream {
    responses: Cursor<Vec<u8>>,
    sent: Vec<u8>,
}

impl MockStream {
    fn new(responses: &[u8]) -> Self {
        Self {
            responses: Cursor::new(responses.to_vec()),
            sent: Vec::new(),
        }
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.responses.get_ref();
        let pos = usize::try_from(self.responses.position()).unwrap();

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.responses.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn uid(n: u32) -> Uid {
    Uid::new(n).unwrap()
}

#[test]
fn test_parser_tagged_ok() {
    let parsed = ResponseParser::parse(b"M0003 OK [READ-WRITE] SELECT completed\r\n").unwrap();
    let Response::Tagged { tag, status, .. } = parsed else {
        panic!("expected tagged response");
    };
    assert_eq!(tag, "M0003");
    assert_eq!(status, Status::Ok);
}

#[tokio::test]
async fn test_poll_session_search_and_fetch() {
    let script = concat!(
        "* OK [CAPABILITY IMAP4rev1] Dovecot ready.\r\n",
        "M0001 OK [CAPABILITY IMAP4rev1 IDLE UIDPLUS] Logged in\r\n",
        "* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n",
        "* 3 EXISTS\r\n",
        "* 0 RECENT\r\n",
        "M0002 OK [READ-WRITE] Select completed\r\n",
        "* SEARCH 12 10\r\n",
        "M0003 OK Search completed\r\n",
        "* 1 FETCH (UID 10 BODY[] {23}\r\n",
        "Subject: hi\r\n\r\nbody\r\n\r\n",
        ")\r\n",
        "* 2 FETCH (UID 12 FLAGS (\\Recent) BODY[] {6}\r\n",
        "x\r\ny\r\n",
        ")\r\n",
        "M0004 OK Fetch completed\r\n",
    );

    let client = Client::from_stream(MockStream::new(script.as_bytes()))
        .await
        .unwrap();
    assert_eq!(client.capabilities(), ["IMAP4rev1".to_string()]);

    let client = client.login("alice", "secret").await.unwrap();
    assert!(client.capabilities().iter().any(|c| c == "UIDPLUS"));

    let mut client = client.select("INBOX").await.unwrap();

    let unseen = client.uid_search("UNSEEN").await.unwrap();
    assert_eq!(unseen, vec![uid(10), uid(12)]);

    let messages = client.uid_fetch_bodies(&unseen).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].uid, uid(10));
    assert_eq!(messages[0].body, b"Subject: hi\r\n\r\nbody\r\n\r\n");
    assert_eq!(messages[1].uid, uid(12));
    assert_eq!(messages[1].body, b"x\r\ny\r\n");
}

#[tokio::test]
async fn test_mark_seen_and_logout() {
    let script = concat!(
        "* OK ready\r\n",
        "M0001 OK Logged in\r\n",
        "M0002 OK [READ-WRITE] Select completed\r\n",
        "* 4 FETCH (UID 33 FLAGS (\\Seen))\r\n",
        "M0003 OK Store completed\r\n",
        "* BYE Logging out\r\n",
        "M0004 OK Logout completed\r\n",
    );

    let client = Client::from_stream(MockStream::new(script.as_bytes()))
        .await
        .unwrap();
    let client = client.login("alice", "secret").await.unwrap();
    let mut client = client.select("Archive").await.unwrap();
    client.uid_mark_seen(uid(33)).await.unwrap();
    client.logout().await.unwrap();
}

#[tokio::test]
async fn test_select_missing_mailbox_fails() {
    let script = concat!(
        "* OK ready\r\n",
        "M0001 OK Logged in\r\n",
        "M0002 NO [NONEXISTENT] Mailbox doesn't exist: Nope\r\n",
    );

    let client = Client::from_stream(MockStream::new(script.as_bytes()))
        .await
        .unwrap();
    let client = client.login("alice", "secret").await.unwrap();
    let err = client.select("Nope").await.unwrap_err();
    assert!(matches!(err, Error::No(_)));
}

#[tokio::test]
async fn test_connection_drop_mid_command() {
    let script = concat!("* OK ready\r\n", "M0001 OK Logged in\r\n");

    let client = Client::from_stream(MockStream::new(script.as_bytes()))
        .await
        .unwrap();
    let client = client.login("alice", "secret").await.unwrap();
    let err = client.select("INBOX").await.unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
