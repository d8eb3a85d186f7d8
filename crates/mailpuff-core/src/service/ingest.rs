//! Mail polling loop: unseen mail in, published pages and chat messages out.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use mailpuff_imap::Uid;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use crate::correlation::CorrelationCache;
use crate::error::MailError;
use crate::mail::{MailSession, MailSource};
use crate::notify::{ChatNotifier, MarkAction, NotificationBuilder};
use crate::store::{ContentStore, TerminationReason};
use crate::summary::summarize;

/// Poll cadence and the lifetime of published pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
    /// Time between poll cycles.
    pub poll_interval: Duration,
    /// TTL of each page; zero uses the store default.
    pub page_ttl: Duration,
    /// View limit of each page; zero uses the store default.
    pub page_max_views: u32,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            page_ttl: Duration::ZERO,
            page_max_views: 0,
        }
    }
}

/// Counts from one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Messages published and announced.
    pub notified: usize,
    /// Messages with nothing to publish.
    pub skipped: usize,
    /// Messages whose notification could not be sent.
    pub failed: usize,
}

impl PollReport {
    const fn is_empty(&self) -> bool {
        self.notified == 0 && self.skipped == 0 && self.failed == 0
    }
}

const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

enum Handled {
    Notified,
    Skipped,
    Failed,
}

/// Publishes unseen mail.
///
/// Every UID is handled once per process, whatever the outcome.
pub struct Ingestor {
    store: ContentStore,
    correlation: Arc<CorrelationCache>,
    mail: Arc<dyn MailSource>,
    chat: Arc<dyn ChatNotifier>,
    notifications: Arc<NotificationBuilder>,
    settings: IngestSettings,
    processed: HashSet<Uid>,
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("settings", &self.settings)
            .field("processed", &self.processed.len())
            .finish_non_exhaustive()
    }
}

impl Ingestor {
    /// Creates an ingestor with an empty processed set.
    #[must_use]
    pub fn new(
        store: ContentStore,
        correlation: Arc<CorrelationCache>,
        mail: Arc<dyn MailSource>,
        chat: Arc<dyn ChatNotifier>,
        notifications: Arc<NotificationBuilder>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            store,
            correlation,
            mail,
            chat,
            notifications,
            settings,
            processed: HashSet::new(),
        }
    }

    /// Runs one poll cycle.
    ///
    /// # Errors
    ///
    /// Returns the mail error that aborted the cycle. Messages handled
    /// before the error stay processed.
    pub async fn poll_once(&mut self) -> Result<PollReport, MailError> {
        let mut session = self.mail.connect().await?;
        let result = self.process(session.as_mut()).await;
        if let Err(e) = session.close().await {
            tracing::debug!(error = %e, "closing mail session failed");
        }
        result
    }

    async fn process(&mut self, session: &mut dyn MailSession) -> Result<PollReport, MailError> {
        let fresh: Vec<Uid> = session
            .list_unseen()
            .await?
            .into_iter()
            .filter(|uid| !self.processed.contains(uid))
            .collect();
        let mut report = PollReport::default();
        if fresh.is_empty() {
            return Ok(report);
        }

        let messages = session.fetch(&fresh).await?;
        for (uid, raw) in messages {
            match self.publish(uid, &raw).await {
                Handled::Notified => report.notified += 1,
                Handled::Skipped => report.skipped += 1,
                Handled::Failed => report.failed += 1,
            }
            self.processed.insert(uid);
        }
        Ok(report)
    }

    async fn publish(&self, uid: Uid, raw: &[u8]) -> Handled {
        let summary = summarize(raw);
        let Some(html) = summary.html_body.as_deref() else {
            tracing::info!(%uid, reason = "no_body", "skipping message");
            return Handled::Skipped;
        };

        let (id, token) =
            match self
                .store
                .create(html, self.settings.page_ttl, self.settings.page_max_views)
            {
                Ok(created) => created,
                Err(e) => {
                    tracing::info!(%uid, reason = %e, "skipping message");
                    return Handled::Skipped;
                }
            };

        self.store.attach_mail_uid(&id, uid);
        let key = (self.notifications.mark_action() == MarkAction::Button)
            .then(|| self.correlation.mint_key(&id, &token));
        let notification = self
            .notifications
            .build(&summary, &id, &token, key.as_deref());

        match self.chat.send_notification(&notification).await {
            Ok(target) => {
                // A page evicted during the send has already been torn down.
                if self.store.attach_notification(&id, target) {
                    self.correlation.set_notification(uid, target);
                } else {
                    tracing::info!(
                        %uid,
                        page_id = %id.masked(),
                        "page gone before its notification was attached"
                    );
                }
                tracing::info!(
                    %uid,
                    page_id = %id.masked(),
                    chat_id = target.chat_id,
                    msg_id = target.message_id,
                    "notification sent"
                );
                Handled::Notified
            }
            Err(e) => {
                tracing::warn!(%uid, page_id = %id.masked(), error = %e, "notification failed");
                if let Some(key) = &key {
                    self.correlation.forget(key);
                }
                self.store.delete(id.as_str(), TerminationReason::Manual);
                Handled::Failed
            }
        }
    }

    /// Polls on a fixed cadence until `shutdown` fires.
    ///
    /// An interval below one second is raised to one second.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let period = self.settings.poll_interval.max(MIN_POLL_INTERVAL);
        if period != self.settings.poll_interval {
            tracing::warn!(
                requested_ms = self.settings.poll_interval.as_millis(),
                "poll interval too short, using 1s"
            );
        }
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_secs = period.as_secs(), "mail polling started");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("mail polling stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            match self.poll_once().await {
                Ok(report) if report.is_empty() => {}
                Ok(report) => tracing::info!(
                    notified = report.notified,
                    skipped = report.skipped,
                    failed = report.failed,
                    "poll cycle done"
                ),
                Err(e) => tracing::warn!(error = %e, "poll cycle failed"),
            }
        }
    }
}
