//! Key-correlation cache.
//!
//! Chat button payloads are short and visible to the chat provider, so they
//! carry a random interaction key instead of the page token. The cache maps
//! the key back to `(page id, token)`, and remembers which chat message
//! announced which mail message so its keyboard can be updated later.
//!
//! Entries are best-effort: a lost entry leaves a stale button behind and
//! nothing worse.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use mailpuff_imap::Uid;

use crate::store::{NotificationRef, PageId, Token};

/// Random bytes behind an interaction key (12 base64url characters).
const KEY_BYTES: usize = 9;

#[derive(Default)]
struct Inner {
    keys: HashMap<String, (PageId, Token)>,
    page_keys: HashMap<PageId, String>,
    notifications: HashMap<Uid, NotificationRef>,
}

/// Interaction keys and mail-to-notification mappings.
#[derive(Default)]
pub struct CorrelationCache {
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for CorrelationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("CorrelationCache")
            .field("keys", &inner.keys.len())
            .field("notifications", &inner.notifications.len())
            .finish()
    }
}

impl CorrelationCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issues a fresh key for a page, replacing any key it had before.
    pub fn mint_key(&self, page_id: &PageId, token: &Token) -> String {
        let mut inner = self.lock();
        let key = loop {
            let candidate = crate::store::random_key(KEY_BYTES);
            if !inner.keys.contains_key(&candidate) {
                break candidate;
            }
        };
        if let Some(old) = inner.page_keys.insert(page_id.clone(), key.clone()) {
            inner.keys.remove(&old);
        }
        inner
            .keys
            .insert(key.clone(), (page_id.clone(), token.clone()));
        key
    }

    /// Looks a key up.
    #[must_use]
    pub fn resolve(&self, key: &str) -> Option<(PageId, Token)> {
        self.lock().keys.get(key).cloned()
    }

    /// Drops a key.
    pub fn forget(&self, key: &str) {
        let mut inner = self.lock();
        if let Some((page_id, _)) = inner.keys.remove(key)
            && inner.page_keys.get(&page_id).is_some_and(|k| k == key)
        {
            inner.page_keys.remove(&page_id);
        }
    }

    /// Drops whatever key a page has.
    pub fn forget_page(&self, page_id: &PageId) {
        let mut inner = self.lock();
        if let Some(key) = inner.page_keys.remove(page_id) {
            inner.keys.remove(&key);
        }
    }

    /// Remembers which chat message announced a mail message.
    pub fn set_notification(&self, uid: Uid, notification: NotificationRef) {
        self.lock().notifications.insert(uid, notification);
    }

    /// The chat message announcing a mail message.
    #[must_use]
    pub fn notification(&self, uid: Uid) -> Option<NotificationRef> {
        self.lock().notifications.get(&uid).copied()
    }

    /// Removes and returns the mapping for a mail message.
    pub fn take_notification(&self, uid: Uid) -> Option<NotificationRef> {
        self.lock().notifications.remove(&uid)
    }

    /// Drops the mapping for a mail message.
    pub fn forget_notification(&self, uid: Uid) {
        self.lock().notifications.remove(&uid);
    }
}
