//! IMAP commands and their wire encoding.

mod tag_generator;

pub use tag_generator::TagGenerator;

use crate::types::UidSet;
use crate::{Error, Result};

/// The commands issued by this client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// LOGOUT.
    Logout,
    /// LOGIN with a username and password.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// SELECT a mailbox read-write.
    Select {
        /// Mailbox name.
        mailbox: String,
    },
    /// `UID SEARCH <criteria>`; the criteria are sent verbatim.
    UidSearch {
        /// Search key, e.g. `UNSEEN`.
        criteria: String,
    },
    /// `UID FETCH <set> (UID BODY.PEEK[])`: full message, flags untouched.
    UidFetchBody {
        /// Messages to download.
        uids: UidSet,
    },
    /// `UID STORE <set> +FLAGS.SILENT (\Seen)`.
    UidMarkSeen {
        /// Messages to flag.
        uids: UidSet,
    },
}

impl Command {
    /// Encodes the command with the given tag, CRLF-terminated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if an argument contains CR, LF or
    /// NUL, or if a UID set is empty.
    pub fn serialize(&self, tag: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_astring(&mut buf, username)?;
                buf.push(b' ');
                write_astring(&mut buf, password)?;
            }
            Self::Select { mailbox } => {
                buf.extend_from_slice(b"SELECT ");
                write_astring(&mut buf, mailbox)?;
            }
            Self::UidSearch { criteria } => {
                check_line_safe(criteria)?;
                buf.extend_from_slice(b"UID SEARCH ");
                buf.extend_from_slice(criteria.as_bytes());
            }
            Self::UidFetchBody { uids } => {
                buf.extend_from_slice(b"UID FETCH ");
                write_uid_set(&mut buf, uids)?;
                buf.extend_from_slice(b" (UID BODY.PEEK[])");
            }
            Self::UidMarkSeen { uids } => {
                buf.extend_from_slice(b"UID STORE ");
                write_uid_set(&mut buf, uids)?;
                buf.extend_from_slice(b" +FLAGS.SILENT (\\Seen)");
            }
        }

        buf.extend_from_slice(b"\r\n");
        Ok(buf)
    }
}

/// Writes an atom when possible, a quoted string otherwise.
fn write_astring(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    check_line_safe(s)?;
    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
    Ok(())
}

fn write_uid_set(buf: &mut Vec<u8>, uids: &UidSet) -> Result<()> {
    if uids.is_empty() {
        return Err(Error::InvalidArgument("empty UID set".to_string()));
    }
    buf.extend_from_slice(uids.to_string().as_bytes());
    Ok(())
}

/// Quoted strings cannot carry line breaks; literals would be needed.
fn check_line_safe(s: &str) -> Result<()> {
    if s.bytes().any(|b| matches!(b, b'\r' | b'\n' | 0)) {
        return Err(Error::InvalidArgument(
            "argument contains CR, LF or NUL".to_string(),
        ));
    }
    Ok(())
}

const fn needs_quoting(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']'
    ) || b < 0x20
        || b >= 0x7F
}
