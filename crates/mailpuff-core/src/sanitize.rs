//! HTML sanitization boundary.

/// Turns untrusted HTML into markup safe to serve.
///
/// Any `Fn(&str) -> String` closure is a sanitizer.
pub trait Sanitizer: Send + Sync {
    /// Returns the safe rendition of `raw`.
    fn sanitize(&self, raw: &str) -> String;
}

impl<F> Sanitizer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn sanitize(&self, raw: &str) -> String {
        self(raw)
    }
}

/// `ammonia` with its default policy.
///
/// Drops `<script>` and `<style>` together with their content, event
/// handler attributes and `javascript:` URLs, and adds
/// `rel="noopener noreferrer"` to links.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmmoniaSanitizer;

impl Sanitizer for AmmoniaSanitizer {
    fn sanitize(&self, raw: &str) -> String {
        ammonia::clean(raw)
    }
}
