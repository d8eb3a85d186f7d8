//! Command tags.
//!
//! Every command carries a tag so its completion response can be told apart
//! from untagged data sent in between.

use std::sync::atomic::{AtomicU32, Ordering};

/// Generates sequential tags such as `M0001`.
///
/// A session never gets close to wrapping the counter; if it did, wrapping
/// only matters for tags still in flight, and the client sends one command
/// at a time.
#[derive(Debug)]
pub struct TagGenerator {
    counter: AtomicU32,
    prefix: char,
}

impl TagGenerator {
    /// Creates a generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self {
            counter: AtomicU32::new(1),
            prefix,
        }
    }

    /// Returns the next tag.
    #[must_use]
    pub fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}{n:04}", self.prefix)
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('M')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_tags() {
        let tags = TagGenerator::default();
        assert_eq!(tags.next(), "M0001");
        assert_eq!(tags.next(), "M0002");
    }

    #[test]
    fn test_prefix_and_padding() {
        let tags = TagGenerator::new('T');
        for _ in 1..100 {
            let _ = tags.next();
        }
        assert_eq!(tags.next(), "T0100");
    }

    #[test]
    fn test_tags_are_unique() {
        let tags = TagGenerator::default();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..5000 {
            assert!(seen.insert(tags.next()), "duplicate tag generated");
        }
    }
}
