//! Mark-as-read, reached either over HTTP or through a chat button.

use std::sync::Arc;

use crate::correlation::CorrelationCache;
use crate::mail::MailSource;
use crate::notify::{ChatNotifier, Interaction, MARK_CALLBACK_PREFIX, NotificationBuilder};
use crate::store::{ContentStore, NotificationRef, PageInfo, mask};

/// Final state of one mark-as-read attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkReadOutcome {
    /// The message is now `\Seen`.
    Success,
    /// The page is gone, expired, or the credentials are wrong.
    NotFound,
    /// The page has no mail message attached.
    NoMailId,
    /// The mail server refused or was unreachable.
    UpstreamFailure,
}

impl MarkReadOutcome {
    /// Short reason used in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::NoMailId => "no_mail_id",
            Self::UpstreamFailure => "upstream_failure",
        }
    }
}

/// Marks the mail behind a page as read.
///
/// Nothing in the store is mutated when an attempt fails.
pub struct MarkReadService {
    store: ContentStore,
    correlation: Arc<CorrelationCache>,
    mail: Arc<dyn MailSource>,
    chat: Arc<dyn ChatNotifier>,
    notifications: Arc<NotificationBuilder>,
}

impl std::fmt::Debug for MarkReadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkReadService")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl MarkReadService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        store: ContentStore,
        correlation: Arc<CorrelationCache>,
        mail: Arc<dyn MailSource>,
        chat: Arc<dyn ChatNotifier>,
        notifications: Arc<NotificationBuilder>,
    ) -> Self {
        Self {
            store,
            correlation,
            mail,
            chat,
            notifications,
        }
    }

    /// Marks the page's mail read, authorizing with its id and token.
    pub async fn mark_read(&self, id: &str, token: &str) -> MarkReadOutcome {
        match self.store.authorize(id, token) {
            Ok(page) => self.mark_page(page, None).await,
            Err(denied) => {
                tracing::info!(page_id = %mask(id), reason = denied.reason(), "mark read refused");
                MarkReadOutcome::NotFound
            }
        }
    }

    /// Handles a chat button press and answers it.
    ///
    /// Returns the reply sent back, or `None` when the payload is not a
    /// mark-as-read request.
    pub async fn handle_interaction(&self, interaction: &Interaction) -> Option<&'static str> {
        let key = interaction.data.strip_prefix(MARK_CALLBACK_PREFIX)?;
        let reply = self.resolve_and_mark(key, interaction.origin).await;

        if let Err(e) = self
            .chat
            .acknowledge_interaction(&interaction.id, reply)
            .await
        {
            tracing::warn!(error = %e, "failed to answer button press");
        }
        Some(reply)
    }

    async fn resolve_and_mark(&self, key: &str, origin: Option<NotificationRef>) -> &'static str {
        if key.is_empty() {
            return "Invalid data";
        }
        let Some((id, token)) = self.correlation.resolve(key) else {
            tracing::info!(reason = "unknown_key", "mark read refused");
            return "Link expired";
        };
        let page = match self.store.authorize(id.as_str(), token.expose()) {
            Ok(page) => page,
            Err(denied) => {
                tracing::info!(page_id = %id.masked(), reason = denied.reason(), "mark read refused");
                return "Link expired or invalid";
            }
        };

        match self.mark_page(page, origin).await {
            MarkReadOutcome::Success => {
                self.correlation.forget(key);
                "Marked as read"
            }
            MarkReadOutcome::NoMailId => "Mail UID missing",
            MarkReadOutcome::UpstreamFailure => "Failed to mark as read",
            MarkReadOutcome::NotFound => "Link expired or invalid",
        }
    }

    async fn mark_page(&self, page: PageInfo, origin: Option<NotificationRef>) -> MarkReadOutcome {
        let Some(uid) = page.mail_uid else {
            tracing::info!(page_id = %page.id.masked(), reason = "no_mail_id", "mark read refused");
            return MarkReadOutcome::NoMailId;
        };
        if let Err(e) = self.mail.mark_seen(uid).await {
            tracing::warn!(%uid, page_id = %page.id.masked(), error = %e, "mark as read failed");
            return MarkReadOutcome::UpstreamFailure;
        }
        tracing::info!(%uid, page_id = %page.id.masked(), "marked as read");

        self.correlation.forget_page(&page.id);
        let target = self
            .correlation
            .take_notification(uid)
            .or(origin)
            .or(page.notification);
        if let Some(target) = target {
            super::retire_mark_button(self.chat.as_ref(), &self.notifications, target, &page).await;
        }
        MarkReadOutcome::Success
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::links::LinkBuilder;
    use crate::notify::{Button, MarkAction};
    use crate::store::{NoEvents, PageId, QueueDispatcher, StoreConfig, Token};
    use crate::testing::{FakeChat, FakeMail, uid};

    struct Harness {
        store: ContentStore,
        correlation: Arc<CorrelationCache>,
        mail: FakeMail,
        chat: Arc<FakeChat>,
        service: MarkReadService,
    }

    fn harness() -> Harness {
        let store = ContentStore::new(
            StoreConfig::default(),
            Arc::new(|raw: &str| raw.to_string()),
            Arc::new(NoEvents),
            Arc::new(QueueDispatcher::new()),
        );
        let correlation = Arc::new(CorrelationCache::new());
        let mail = FakeMail::default();
        let chat = Arc::new(FakeChat::default());
        let notifications = Arc::new(NotificationBuilder::new(
            7,
            LinkBuilder::new("https://mail.example.com/view").unwrap(),
            MarkAction::Button,
        ));
        let service = MarkReadService::new(
            store.clone(),
            Arc::clone(&correlation),
            Arc::new(mail.clone()),
            Arc::clone(&chat) as Arc<dyn ChatNotifier>,
            notifications,
        );
        Harness {
            store,
            correlation,
            mail,
            chat,
            service,
        }
    }

    const MESSAGE: NotificationRef = NotificationRef {
        chat_id: 7,
        message_id: 40,
    };

    fn published(h: &Harness, with_uid: bool) -> (PageId, Token) {
        let (id, token) = h.store.create("<p>hi</p>", Duration::ZERO, 0).unwrap();
        h.store.attach_notification(&id, MESSAGE);
        if with_uid {
            h.store.attach_mail_uid(&id, uid(12));
            h.correlation.set_notification(uid(12), MESSAGE);
        }
        (id, token)
    }

    fn press(id: &str, data: &str) -> Interaction {
        Interaction {
            id: id.to_string(),
            data: data.to_string(),
            origin: Some(MESSAGE),
        }
    }

    #[tokio::test]
    async fn test_mark_read_by_credentials() {
        let h = harness();
        let (id, token) = published(&h, true);

        let outcome = h.service.mark_read(id.as_str(), token.expose()).await;
        assert_eq!(outcome, MarkReadOutcome::Success);
        assert_eq!(h.mail.seen(), vec![uid(12)]);
        assert!(h.correlation.notification(uid(12)).is_none());
        assert_eq!(
            h.chat.updates(),
            vec![(
                MESSAGE,
                vec![Button::url(
                    "Open html",
                    format!(
                        "https://mail.example.com/view?id={}&token={}",
                        id.as_str(),
                        token.expose()
                    )
                )]
            )]
        );
        // The page itself stays viewable.
        assert_eq!(h.store.len(), 1);
    }

    #[tokio::test]
    async fn test_wrong_token_is_not_found() {
        let h = harness();
        let (id, _) = published(&h, true);

        let outcome = h.service.mark_read(id.as_str(), "nope").await;
        assert_eq!(outcome, MarkReadOutcome::NotFound);
        assert!(h.mail.seen().is_empty());
    }

    #[tokio::test]
    async fn test_page_without_uid() {
        let h = harness();
        let (id, token) = published(&h, false);

        let outcome = h.service.mark_read(id.as_str(), token.expose()).await;
        assert_eq!(outcome, MarkReadOutcome::NoMailId);
        assert_eq!(h.mail.state.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_keeps_state() {
        let h = harness();
        let (id, token) = published(&h, true);
        let key = h.correlation.mint_key(&id, &token);
        h.mail.state.fail_mark.store(true, Ordering::SeqCst);

        let outcome = h.service.mark_read(id.as_str(), token.expose()).await;
        assert_eq!(outcome, MarkReadOutcome::UpstreamFailure);
        assert!(h.correlation.resolve(&key).is_some());
        assert_eq!(h.correlation.notification(uid(12)), Some(MESSAGE));
        assert!(h.chat.updates().is_empty());
    }

    #[tokio::test]
    async fn test_button_marks_once_and_forgets_key() {
        let h = harness();
        let (id, token) = published(&h, true);
        let key = h.correlation.mint_key(&id, &token);
        let data = format!("{MARK_CALLBACK_PREFIX}{key}");

        let reply = h.service.handle_interaction(&press("q1", &data)).await;
        assert_eq!(reply, Some("Marked as read"));
        assert_eq!(h.mail.seen(), vec![uid(12)]);
        assert!(h.correlation.resolve(&key).is_none());

        // Replaying the same key finds nothing.
        let reply = h.service.handle_interaction(&press("q2", &data)).await;
        assert_eq!(reply, Some("Link expired"));
        assert_eq!(h.mail.seen(), vec![uid(12)]);
        assert_eq!(
            h.chat.acks(),
            vec![
                ("q1".to_string(), "Marked as read".to_string()),
                ("q2".to_string(), "Link expired".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_button_replies() {
        let h = harness();
        assert_eq!(
            h.service.handle_interaction(&press("a", "mark:")).await,
            Some("Invalid data")
        );
        assert_eq!(h.service.handle_interaction(&press("b", "other:x")).await, None);

        let (id, token) = published(&h, false);
        let key = h.correlation.mint_key(&id, &token);
        assert_eq!(
            h.service
                .handle_interaction(&press("c", &format!("mark:{key}")))
                .await,
            Some("Mail UID missing")
        );

        h.store.delete(id.as_str(), crate::store::TerminationReason::Manual);
        assert_eq!(
            h.service
                .handle_interaction(&press("d", &format!("mark:{key}")))
                .await,
            Some("Link expired or invalid")
        );

        let (id, token) = published(&h, true);
        let key = h.correlation.mint_key(&id, &token);
        h.mail.state.fail_mark.store(true, Ordering::SeqCst);
        assert_eq!(
            h.service
                .handle_interaction(&press("e", &format!("mark:{key}")))
                .await,
            Some("Failed to mark as read")
        );
        assert_eq!(h.chat.acks().len(), 4);
    }
}
