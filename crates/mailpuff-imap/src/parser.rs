//! Response parser.
//!
//! Sans-I/O: it works on one complete response as produced by
//! [`FramedStream::read_response`](crate::FramedStream::read_response),
//! literals included. Only the responses this client acts on are decoded in
//! detail; everything else is kept as [`UntaggedResponse::Other`].

use crate::types::{Status, Uid};
use crate::{Error, Result};

/// A parsed server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Completion of a command.
    Tagged {
        /// Tag of the completed command.
        tag: String,
        /// Completion status.
        status: Status,
        /// Human-readable text, response code included.
        text: String,
    },
    /// Data or status not tied to a single command.
    Untagged(UntaggedResponse),
    /// Continuation request (`+ ...`).
    Continuation(String),
}

/// Untagged responses understood by this client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// `* OK`, `* NO`, `* BAD`, `* PREAUTH` or `* BYE`.
    Condition {
        /// Condition status.
        status: Status,
        /// Remaining text.
        text: String,
    },
    /// `* CAPABILITY ...`.
    Capability(Vec<String>),
    /// `* SEARCH ...` (UIDs when answering `UID SEARCH`).
    Search(Vec<Uid>),
    /// `* n EXISTS`.
    Exists(u32),
    /// `* n FETCH (...)`.
    Fetch {
        /// Message sequence number.
        seq: u32,
        /// Decoded attributes.
        data: FetchData,
    },
    /// Anything else, as text.
    Other(String),
}

/// Attributes decoded from a FETCH response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchData {
    /// `UID` attribute.
    pub uid: Option<Uid>,
    /// `FLAGS` attribute.
    pub flags: Vec<String>,
    /// `BODY[]` or `RFC822` content.
    pub body: Option<Vec<u8>>,
}

/// A downloaded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMessage {
    /// Message UID.
    pub uid: Uid,
    /// Flags reported alongside the body, if any.
    pub flags: Vec<String>,
    /// Raw RFC 5322 message.
    pub body: Vec<u8>,
}

impl FetchData {
    /// Converts into a message when both UID and body are present.
    #[must_use]
    pub fn into_message(self) -> Option<FetchedMessage> {
        Some(FetchedMessage {
            uid: self.uid?,
            flags: self.flags,
            body: self.body?,
        })
    }
}

/// Entry point for parsing responses.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one complete response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] when the response is malformed.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut cur = Cursor::new(input);
        match cur.peek() {
            Some(b'*') => {
                cur.bump();
                cur.expect(b' ')?;
                parse_untagged(&mut cur).map(Response::Untagged)
            }
            Some(b'+') => {
                cur.bump();
                cur.skip_spaces();
                Ok(Response::Continuation(cur.rest_of_line()))
            }
            Some(_) => {
                let tag = cur.atom_str()?;
                cur.expect(b' ')?;
                let word = cur.atom_str()?;
                let status = Status::from_keyword(&word)
                    .ok_or_else(|| Error::parse(cur.pos, format!("unknown status {word}")))?;
                cur.skip_spaces();
                Ok(Response::Tagged {
                    tag,
                    status,
                    text: cur.rest_of_line(),
                })
            }
            None => Err(Error::parse(0, "empty response")),
        }
    }
}

fn parse_untagged(cur: &mut Cursor<'_>) -> Result<UntaggedResponse> {
    if cur.peek().is_some_and(|b| b.is_ascii_digit()) {
        let n = cur.number()?;
        cur.expect(b' ')?;
        let word = cur.atom_str()?.to_ascii_uppercase();
        return match word.as_str() {
            "EXISTS" => Ok(UntaggedResponse::Exists(n)),
            "FETCH" => {
                cur.skip_spaces();
                let data = parse_fetch(cur)?;
                Ok(UntaggedResponse::Fetch { seq: n, data })
            }
            _ => Ok(UntaggedResponse::Other(format!("{n} {word}"))),
        };
    }

    let word = cur.atom_str()?.to_ascii_uppercase();
    if let Some(status) = Status::from_keyword(&word) {
        cur.skip_spaces();
        return Ok(UntaggedResponse::Condition {
            status,
            text: cur.rest_of_line(),
        });
    }

    match word.as_str() {
        "CAPABILITY" => Ok(UntaggedResponse::Capability(
            cur.rest_of_line()
                .split_ascii_whitespace()
                .map(str::to_string)
                .collect(),
        )),
        // Trailing `(MODSEQ n)` and the like are ignored.
        "SEARCH" => Ok(UntaggedResponse::Search(
            cur.rest_of_line()
                .split_ascii_whitespace()
                .map_while(|w| w.parse::<u32>().ok())
                .filter_map(Uid::new)
                .collect(),
        )),
        _ => {
            cur.skip_spaces();
            let rest = cur.rest_of_line();
            Ok(UntaggedResponse::Other(if rest.is_empty() {
                word
            } else {
                format!("{word} {rest}")
            }))
        }
    }
}

fn parse_fetch(cur: &mut Cursor<'_>) -> Result<FetchData> {
    let mut data = FetchData::default();
    cur.expect(b'(')?;

    loop {
        cur.skip_spaces();
        match cur.peek() {
            Some(b')') => {
                cur.bump();
                return Ok(data);
            }
            None => return Err(Error::parse(cur.pos, "unterminated FETCH")),
            Some(_) => {}
        }

        let name = cur.item_name()?.to_ascii_uppercase();
        let mut section = None;
        if cur.peek() == Some(b'[') {
            section = Some(cur.bracketed()?);
            // Partial fetch origin: BODY[]<0>
            if cur.peek() == Some(b'<') {
                cur.skip_until(b'>')?;
            }
        }
        cur.expect(b' ')?;

        match (name.as_str(), section.as_deref()) {
            ("UID", None) => {
                let n = cur.number()?;
                data.uid = Uid::new(n);
            }
            ("FLAGS", None) => data.flags = cur.flag_list()?,
            ("BODY" | "BINARY", Some("")) | ("RFC822", None) => data.body = cur.nstring()?,
            _ => cur.skip_value()?,
        }
    }
}

struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.peek() == Some(byte) {
            self.bump();
            Ok(())
        } else {
            Err(Error::parse(
                self.pos,
                format!("expected {:?}", char::from(byte)),
            ))
        }
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.bump();
        }
    }

    fn take_while(&mut self, keep: impl Fn(u8) -> bool) -> &'a [u8] {
        let start = self.pos;
        while self.peek().is_some_and(&keep) {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn atom_str(&mut self) -> Result<String> {
        let atom = self.take_while(|b| !matches!(b, b' ' | b'\r' | b'\n' | b'(' | b')'));
        if atom.is_empty() {
            return Err(Error::parse(self.pos, "expected atom"));
        }
        Ok(String::from_utf8_lossy(atom).into_owned())
    }

    fn item_name(&mut self) -> Result<String> {
        let name =
            self.take_while(|b| !matches!(b, b' ' | b'\r' | b'\n' | b'(' | b')' | b'[' | b'<'));
        if name.is_empty() {
            return Err(Error::parse(self.pos, "expected FETCH item name"));
        }
        Ok(String::from_utf8_lossy(name).into_owned())
    }

    fn number(&mut self) -> Result<u32> {
        let start = self.pos;
        let digits = self.take_while(|b| b.is_ascii_digit());
        std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::parse(start, "expected number"))
    }

    fn rest_of_line(&mut self) -> String {
        let text = self.take_while(|b| b != b'\r' && b != b'\n');
        String::from_utf8_lossy(text).into_owned()
    }

    fn skip_until(&mut self, end: u8) -> Result<()> {
        while let Some(b) = self.peek() {
            self.bump();
            if b == end {
                return Ok(());
            }
        }
        Err(Error::parse(self.pos, "unexpected end of response"))
    }

    /// Reads `[...]` and returns the inside.
    fn bracketed(&mut self) -> Result<String> {
        self.expect(b'[')?;
        let inner = self.take_while(|b| b != b']');
        let inner = String::from_utf8_lossy(inner).into_owned();
        self.expect(b']')?;
        Ok(inner)
    }

    fn flag_list(&mut self) -> Result<Vec<String>> {
        self.expect(b'(')?;
        let mut flags = Vec::new();
        loop {
            self.skip_spaces();
            if self.peek() == Some(b')') {
                self.bump();
                return Ok(flags);
            }
            flags.push(self.atom_str()?);
        }
    }

    fn quoted(&mut self) -> Result<Vec<u8>> {
        self.expect(b'"')?;
        let mut out = Vec::new();
        loop {
            match self.peek() {
                Some(b'"') => {
                    self.bump();
                    return Ok(out);
                }
                Some(b'\\') => {
                    self.bump();
                    let escaped = self
                        .peek()
                        .ok_or_else(|| Error::parse(self.pos, "unterminated quoted string"))?;
                    out.push(escaped);
                    self.bump();
                }
                Some(b) => {
                    out.push(b);
                    self.bump();
                }
                None => return Err(Error::parse(self.pos, "unterminated quoted string")),
            }
        }
    }

    fn literal(&mut self) -> Result<Vec<u8>> {
        self.expect(b'{')?;
        let len = self.number()? as usize;
        if self.peek() == Some(b'+') {
            self.bump();
        }
        self.expect(b'}')?;
        self.expect(b'\r')?;
        self.expect(b'\n')?;
        let end = self.pos + len;
        let bytes = self
            .input
            .get(self.pos..end)
            .ok_or_else(|| Error::parse(self.pos, "literal shorter than announced"))?;
        self.pos = end;
        Ok(bytes.to_vec())
    }

    /// `NIL`, a quoted string or a literal.
    fn nstring(&mut self) -> Result<Option<Vec<u8>>> {
        match self.peek() {
            Some(b'"') => self.quoted().map(Some),
            Some(b'{') => self.literal().map(Some),
            _ => {
                let word = self.atom_str()?;
                if word.eq_ignore_ascii_case("NIL") {
                    Ok(None)
                } else {
                    Err(Error::parse(self.pos, format!("expected string, got {word}")))
                }
            }
        }
    }

    /// Skips an attribute value of any shape.
    fn skip_value(&mut self) -> Result<()> {
        match self.peek() {
            Some(b'(') => {
                self.bump();
                loop {
                    self.skip_spaces();
                    match self.peek() {
                        Some(b')') => {
                            self.bump();
                            return Ok(());
                        }
                        None => return Err(Error::parse(self.pos, "unterminated list")),
                        Some(_) => self.skip_value()?,
                    }
                }
            }
            Some(b'"') => self.quoted().map(drop),
            Some(b'{') => self.literal().map(drop),
            Some(_) => self.atom_str().map(drop),
            None => Err(Error::parse(self.pos, "expected value")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn untagged(input: &[u8]) -> UntaggedResponse {
        match ResponseParser::parse(input).unwrap() {
            Response::Untagged(u) => u,
            other => panic!("expected untagged, got {other:?}"),
        }
    }

    #[test]
    fn test_tagged_ok() {
        let parsed = ResponseParser::parse(b"M0003 OK [READ-WRITE] SELECT completed\r\n").unwrap();
        assert_eq!(
            parsed,
            Response::Tagged {
                tag: "M0003".to_string(),
                status: Status::Ok,
                text: "[READ-WRITE] SELECT completed".to_string(),
            }
        );
    }

    #[test]
    fn test_tagged_no() {
        let parsed = ResponseParser::parse(b"M0002 NO [AUTHENTICATIONFAILED] nope\r\n").unwrap();
        assert!(matches!(
            parsed,
            Response::Tagged {
                status: Status::No,
                ..
            }
        ));
    }

    #[test]
    fn test_greeting_condition() {
        assert_eq!(
            untagged(b"* OK [CAPABILITY IMAP4rev1] Dovecot ready.\r\n"),
            UntaggedResponse::Condition {
                status: Status::Ok,
                text: "[CAPABILITY IMAP4rev1] Dovecot ready.".to_string(),
            }
        );
    }

    #[test]
    fn test_search_results() {
        let UntaggedResponse::Search(uids) = untagged(b"* SEARCH 4 17 230\r\n") else {
            panic!("expected SEARCH");
        };
        let values: Vec<u32> = uids.into_iter().map(Uid::get).collect();
        assert_eq!(values, vec![4, 17, 230]);
    }

    #[test]
    fn test_empty_search() {
        assert_eq!(untagged(b"* SEARCH\r\n"), UntaggedResponse::Search(vec![]));
    }

    #[test]
    fn test_search_with_modseq_suffix() {
        let UntaggedResponse::Search(uids) = untagged(b"* SEARCH 2 3 (MODSEQ 917162500)\r\n")
        else {
            panic!("expected SEARCH");
        };
        assert_eq!(uids.len(), 2);
    }

    #[test]
    fn test_exists() {
        assert_eq!(untagged(b"* 23 EXISTS\r\n"), UntaggedResponse::Exists(23));
    }

    #[test]
    fn test_fetch_body_literal() {
        let input = b"* 3 FETCH (UID 42 FLAGS (\\Recent) BODY[] {12}\r\nHello\r\nWorld)\r\n";
        let UntaggedResponse::Fetch { seq, data } = untagged(input) else {
            panic!("expected FETCH");
        };
        assert_eq!(seq, 3);
        let message = data.into_message().unwrap();
        assert_eq!(message.uid.get(), 42);
        assert_eq!(message.flags, vec!["\\Recent".to_string()]);
        assert_eq!(message.body, b"Hello\r\nWorld");
    }

    #[test]
    fn test_fetch_uid_after_body() {
        let input = b"* 1 FETCH (BODY[] {2}\r\nhi UID 9)\r\n";
        let UntaggedResponse::Fetch { data, .. } = untagged(input) else {
            panic!("expected FETCH");
        };
        assert_eq!(data.uid.map(Uid::get), Some(9));
        assert_eq!(data.body.as_deref(), Some(&b"hi"[..]));
    }

    #[test]
    fn test_fetch_skips_unknown_items() {
        let input =
            b"* 1 FETCH (RFC822.SIZE 120 INTERNALDATE \"17-Jul-1996 02:44:25 -0700\" X-GM-LABELS (\\Inbox \"a b\") UID 5 BODY[] NIL)\r\n";
        let UntaggedResponse::Fetch { data, .. } = untagged(input) else {
            panic!("expected FETCH");
        };
        assert_eq!(data.uid.map(Uid::get), Some(5));
        assert!(data.body.is_none());
        assert!(data.into_message().is_none());
    }

    #[test]
    fn test_fetch_header_section_is_not_the_body() {
        let input = b"* 1 FETCH (UID 5 BODY[HEADER] {4}\r\nX: y)\r\n";
        let UntaggedResponse::Fetch { data, .. } = untagged(input) else {
            panic!("expected FETCH");
        };
        assert!(data.body.is_none());
    }

    #[test]
    fn test_truncated_literal_is_error() {
        let input = b"* 1 FETCH (UID 5 BODY[] {40}\r\nshort)\r\n";
        assert!(ResponseParser::parse(input).is_err());
    }

    #[test]
    fn test_continuation() {
        assert_eq!(
            ResponseParser::parse(b"+ Ready for literal\r\n").unwrap(),
            Response::Continuation("Ready for literal".to_string())
        );
    }

    #[test]
    fn test_other_untagged() {
        assert_eq!(
            untagged(b"* FLAGS (\\Seen \\Answered)\r\n"),
            UntaggedResponse::Other("FLAGS (\\Seen \\Answered)".to_string())
        );
    }

    proptest::proptest! {
        #[test]
        fn test_parser_never_panics(input in proptest::collection::vec(proptest::num::u8::ANY, 0..256)) {
            let _ = ResponseParser::parse(&input);
        }
    }
}
