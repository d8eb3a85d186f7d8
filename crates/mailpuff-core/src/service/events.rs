//! Page lifecycle handlers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::correlation::CorrelationCache;
use crate::mail::MailSource;
use crate::notify::{ChatNotifier, NotificationBuilder};
use crate::store::{PageEvents, PageInfo, TerminationReason};

/// Reacts to first views and terminations of published pages.
pub struct BridgeEvents {
    mark_seen_on_view: bool,
    mail: Arc<dyn MailSource>,
    chat: Arc<dyn ChatNotifier>,
    correlation: Arc<CorrelationCache>,
    notifications: Arc<NotificationBuilder>,
}

impl std::fmt::Debug for BridgeEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeEvents")
            .field("mark_seen_on_view", &self.mark_seen_on_view)
            .finish_non_exhaustive()
    }
}

impl BridgeEvents {
    /// Creates the handlers; `mark_seen_on_view` marks mail read when its
    /// page is first opened.
    #[must_use]
    pub fn new(
        mark_seen_on_view: bool,
        mail: Arc<dyn MailSource>,
        chat: Arc<dyn ChatNotifier>,
        correlation: Arc<CorrelationCache>,
        notifications: Arc<NotificationBuilder>,
    ) -> Self {
        Self {
            mark_seen_on_view,
            mail,
            chat,
            correlation,
            notifications,
        }
    }
}

#[async_trait]
impl PageEvents for BridgeEvents {
    async fn on_first_view(&self, page: PageInfo) {
        if !self.mark_seen_on_view {
            return;
        }
        let Some(uid) = page.mail_uid else {
            return;
        };

        if let Err(e) = self.mail.mark_seen(uid).await {
            tracing::warn!(%uid, page_id = %page.id.masked(), error = %e, "mark seen on first view failed");
            return;
        }
        tracing::info!(%uid, page_id = %page.id.masked(), "marked as read on first view");

        self.correlation.forget_page(&page.id);
        if let Some(target) = self.correlation.take_notification(uid).or(page.notification) {
            super::retire_mark_button(self.chat.as_ref(), &self.notifications, target, &page).await;
        }
    }

    async fn on_terminated(&self, page: PageInfo, reason: TerminationReason) {
        let (chat_id, msg_id) = page
            .notification
            .map_or((None, None), |n| (Some(n.chat_id), Some(n.message_id)));
        tracing::info!(
            page_id = %page.id.masked(),
            %reason,
            chat_id,
            msg_id,
            views = page.views,
            "page terminated"
        );

        self.correlation.forget_page(&page.id);
        if let Some(uid) = page.mail_uid {
            self.correlation.forget_notification(uid);
        }
    }
}
