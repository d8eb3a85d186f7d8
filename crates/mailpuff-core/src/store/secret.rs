//! Random identifiers, token comparison and log masking.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;

/// Random bytes behind a page token (24 base64url characters).
pub(crate) const TOKEN_BYTES: usize = 18;

/// `len` bytes from the OS generator, base64url without padding.
pub(crate) fn random_urlsafe(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compares two byte strings without an early exit on the first mismatch.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Shortens an identifier for logs: `abcd…wxyz`.
///
/// Identifiers of eight characters or fewer are hidden entirely.
#[must_use]
pub fn mask(id: &str) -> String {
    let count = id.chars().count();
    if count == 0 {
        return "(empty)".to_string();
    }
    if count <= 8 {
        return "…".to_string();
    }
    let head: String = id.chars().take(4).collect();
    let tail: String = id.chars().skip(count - 4).collect();
    format!("{head}…{tail}")
}
