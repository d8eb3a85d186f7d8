//! Ephemeral content store.
//!
//! Pages hold sanitized HTML behind an unguessable id and an independent
//! secret token. A page disappears when its TTL elapses, when its last
//! allowed view has been served, or when it is deleted; whichever happens
//! first wins and the other causes find nothing to do.
//!
//! Every check-then-evict sequence runs under a single acquisition of one
//! mutex. Lifecycle callbacks ([`PageEvents`]) are collected while the lock
//! is held and handed to the [`Dispatcher`] after it is released, so a slow
//! or re-entrant callback can never stall or deadlock the store.

mod dispatch;
mod page;
mod secret;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mailpuff_imap::Uid;
use tokio::time::Instant;

pub use dispatch::{Dispatcher, QueueDispatcher, Task, TokioDispatcher};
pub use page::{NotificationRef, PageId, PageInfo, TerminationReason, Token, ViewOutcome};
pub use secret::mask;
pub(crate) use secret::random_urlsafe as random_key;

use crate::error::{AccessDenied, CreateError};
use crate::sanitize::Sanitizer;
use page::Page;

/// TTLs are clamped to this so deadline arithmetic cannot overflow.
const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Lifecycle callbacks.
///
/// Each runs at most once per page and never under the store lock.
#[async_trait]
pub trait PageEvents: Send + Sync {
    /// The page was served for the first time.
    async fn on_first_view(&self, page: PageInfo);

    /// The page was removed.
    async fn on_terminated(&self, page: PageInfo, reason: TerminationReason);
}

/// Ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvents;

#[async_trait]
impl PageEvents for NoEvents {
    async fn on_first_view(&self, _page: PageInfo) {}

    async fn on_terminated(&self, _page: PageInfo, _reason: TerminationReason) {}
}

/// Defaults applied when `create` is called with zero values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// TTL used when none is given.
    pub default_ttl: Duration,
    /// View limit used when none is given; 0 means unlimited.
    pub default_max_views: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(48 * 60 * 60),
            default_max_views: 3,
        }
    }
}

enum Event {
    FirstView(PageInfo),
    Terminated(PageInfo, TerminationReason),
}

struct Shared {
    pages: Mutex<HashMap<PageId, Page>>,
    config: StoreConfig,
    sanitizer: Arc<dyn Sanitizer>,
    events: Arc<dyn PageEvents>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, HashMap<PageId, Page>> {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: &str, reason: TerminationReason) -> Option<PageInfo> {
        let removed = self.lock().remove(id)?;
        let info = removed.info;
        self.dispatch(Event::Terminated(info.clone(), reason));
        Some(info)
    }

    fn dispatch(&self, event: Event) {
        let events = Arc::clone(&self.events);
        let task: Task = match event {
            Event::FirstView(info) => Box::pin(async move { events.on_first_view(info).await }),
            Event::Terminated(info, reason) => {
                Box::pin(async move { events.on_terminated(info, reason).await })
            }
        };
        self.dispatcher.dispatch(task);
    }
}

/// In-memory page store. Cloning yields another handle to the same pages.
#[derive(Clone)]
pub struct ContentStore {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore")
            .field("config", &self.shared.config)
            .field("pages", &self.len())
            .finish_non_exhaustive()
    }
}

impl ContentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(
        config: StoreConfig,
        sanitizer: Arc<dyn Sanitizer>,
        events: Arc<dyn PageEvents>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                pages: Mutex::new(HashMap::new()),
                config,
                sanitizer,
                events,
                dispatcher,
            }),
        }
    }

    /// Sanitizes `raw_html` and publishes it.
    ///
    /// A zero `ttl` or `max_views` falls back to the store defaults; a view
    /// limit that is still zero afterwards means unlimited. Must be called
    /// from within a Tokio runtime: the TTL eviction runs as a spawned task.
    ///
    /// # Errors
    ///
    /// [`CreateError::EmptyInput`] for empty input and
    /// [`CreateError::EmptyContent`] when sanitization leaves only
    /// whitespace.
    pub fn create(
        &self,
        raw_html: &str,
        ttl: Duration,
        max_views: u32,
    ) -> Result<(PageId, Token), CreateError> {
        if raw_html.is_empty() {
            return Err(CreateError::EmptyInput);
        }
        let content = self.shared.sanitizer.sanitize(raw_html);
        if content.trim().is_empty() {
            return Err(CreateError::EmptyContent);
        }

        let config = &self.shared.config;
        let ttl = if ttl.is_zero() { config.default_ttl } else { ttl }.min(MAX_TTL);
        let max_views = if max_views == 0 {
            config.default_max_views
        } else {
            max_views
        };

        let id = PageId::generate();
        let token = Token::generate();
        let created_at = Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|d| created_at.checked_add_signed(d))
            .unwrap_or(created_at);
        let deadline = Instant::now() + ttl;

        let page = Page {
            info: PageInfo {
                id: id.clone(),
                token: token.clone(),
                created_at,
                expires_at,
                max_views,
                views: 0,
                notification: None,
                mail_uid: None,
            },
            content,
            deadline,
        };
        self.shared.lock().insert(id.clone(), page);

        spawn_expiry(Arc::downgrade(&self.shared), id.clone(), deadline);
        tracing::debug!(page_id = %id.masked(), ttl_secs = ttl.as_secs(), max_views, "page created");

        Ok((id, token))
    }

    /// Records the chat message announcing the page.
    ///
    /// Returns `false` if the page no longer exists.
    pub fn attach_notification(&self, id: &PageId, notification: NotificationRef) -> bool {
        self.shared
            .lock()
            .get_mut(id.as_str())
            .map(|page| page.info.notification = Some(notification))
            .is_some()
    }

    /// Records the mail message the page was rendered from.
    ///
    /// Returns `false` if the page no longer exists.
    pub fn attach_mail_uid(&self, id: &PageId, uid: Uid) -> bool {
        self.shared
            .lock()
            .get_mut(id.as_str())
            .map(|page| page.info.mail_uid = Some(uid))
            .is_some()
    }

    /// Serves a page and counts the view.
    ///
    /// The view that reaches the limit is still served; the page is removed
    /// right after its content has been captured.
    pub fn view(&self, id: &str, token: &str) -> ViewOutcome {
        let now = Instant::now();
        let mut fired = Vec::with_capacity(2);

        let outcome = {
            let mut pages = self.shared.lock();
            let Some(page) = pages.get_mut(id) else {
                return ViewOutcome::NotFound;
            };
            if !page.info.token.matches(token) {
                return ViewOutcome::InvalidToken;
            }

            if page.is_expired(now) {
                if let Some(page) = pages.remove(id) {
                    fired.push(Event::Terminated(page.info, TerminationReason::Expired));
                }
                ViewOutcome::Expired
            } else {
                page.info.views += 1;
                if page.info.views == 1 {
                    fired.push(Event::FirstView(page.info.clone()));
                }
                let content = page.content.clone();
                if page.limit_reached()
                    && let Some(page) = pages.remove(id)
                {
                    fired.push(Event::Terminated(
                        page.info,
                        TerminationReason::ViewLimitReached,
                    ));
                }
                ViewOutcome::Served(content)
            }
        };

        for event in fired {
            self.shared.dispatch(event);
        }
        outcome
    }

    /// Checks access without counting a view.
    ///
    /// # Errors
    ///
    /// Returns the reason access was denied. A page found past its expiry
    /// is evicted.
    pub fn authorize(&self, id: &str, token: &str) -> Result<PageInfo, AccessDenied> {
        let now = Instant::now();
        let expired = {
            let mut pages = self.shared.lock();
            let Some(page) = pages.get(id) else {
                return Err(AccessDenied::NotFound);
            };
            if !page.info.token.matches(token) {
                return Err(AccessDenied::InvalidToken);
            }
            if !page.is_expired(now) {
                return Ok(page.info.clone());
            }
            pages.remove(id)
        };

        if let Some(page) = expired {
            self.shared
                .dispatch(Event::Terminated(page.info, TerminationReason::Expired));
        }
        Err(AccessDenied::Expired)
    }

    /// Removes a page and fires the termination callback if it was present.
    pub fn delete(&self, id: &str, reason: TerminationReason) -> Option<PageInfo> {
        self.shared.remove(id, reason)
    }

    /// Number of live pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    /// Whether no page is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.lock().is_empty()
    }
}

/// Sleeps until `deadline`, then evicts the page if it is still there.
///
/// Holds only a weak handle so pending timers never keep a dropped store
/// alive.
fn spawn_expiry(shared: Weak<Shared>, id: PageId, deadline: Instant) {
    tokio::spawn(async move {
        tokio::time::sleep_until(deadline).await;
        let Some(shared) = shared.upgrade() else {
            return;
        };
        if shared.remove(id.as_str(), TerminationReason::Expired).is_some() {
            tracing::debug!(page_id = %id.masked(), "page expired");
        }
    });
}
