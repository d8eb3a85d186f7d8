//! Core IMAP types: UIDs, UID sets and response status.

use std::fmt;
use std::num::NonZeroU32;

/// Unique identifier of a message within a mailbox.
///
/// UIDs are strictly ascending and, unlike sequence numbers, stay stable
/// while other messages are expunged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uid(NonZeroU32);

impl Uid {
    /// Creates a UID. Returns `None` for 0, which is never a valid UID.
    #[must_use]
    pub const fn new(n: u32) -> Option<Self> {
        match NonZeroU32::new(n) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A set of UIDs as sent in `UID FETCH` / `UID STORE`.
///
/// Consecutive UIDs are collapsed into ranges on the wire (`4:7,9`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UidSet(Vec<Uid>);

impl UidSet {
    /// Creates a set from UIDs in any order; duplicates are dropped.
    #[must_use]
    pub fn new(uids: impl IntoIterator<Item = Uid>) -> Self {
        let mut uids: Vec<Uid> = uids.into_iter().collect();
        uids.sort_unstable();
        uids.dedup();
        Self(uids)
    }

    /// Creates a set holding a single UID.
    #[must_use]
    pub fn single(uid: Uid) -> Self {
        Self(vec![uid])
    }

    /// Returns true if the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of UIDs in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for UidSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut i = 0;
        let mut first = true;
        while i < self.0.len() {
            let start = self.0[i].get();
            let mut end = start;
            while i + 1 < self.0.len() && self.0[i + 1].get() == end + 1 {
                end += 1;
                i += 1;
            }
            if !first {
                f.write_str(",")?;
            }
            first = false;
            if start == end {
                write!(f, "{start}")?;
            } else {
                write!(f, "{start}:{end}")?;
            }
            i += 1;
        }
        Ok(())
    }
}

/// Status of a tagged or untagged condition response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command completed successfully.
    Ok,
    /// Command failed.
    No,
    /// Command was malformed or not allowed.
    Bad,
    /// Connection is already authenticated (greeting only).
    PreAuth,
    /// Server is closing the connection.
    Bye,
}

impl Status {
    /// Parses a status keyword, case-insensitively.
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "OK" => Some(Self::Ok),
            "NO" => Some(Self::No),
            "BAD" => Some(Self::Bad),
            "PREAUTH" => Some(Self::PreAuth),
            "BYE" => Some(Self::Bye),
            _ => None,
        }
    }
}
