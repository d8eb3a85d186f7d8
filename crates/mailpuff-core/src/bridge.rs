//! Assembles the store, services and HTTP surface into one runnable bridge.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::correlation::CorrelationCache;
use crate::error::Result;
use crate::links::LinkBuilder;
use crate::mail::MailSource;
use crate::notify::{ChatNotifier, InteractionSource, MarkAction, NotificationBuilder};
use crate::sanitize::AmmoniaSanitizer;
use crate::service::{BridgeEvents, IngestSettings, Ingestor, MarkReadService, run_listener};
use crate::store::{ContentStore, StoreConfig, TokioDispatcher};
use crate::web::{self, AppState};

/// Bridge settings that are not collaborator credentials.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Chat that receives notifications.
    pub chat_id: i64,
    /// Public viewer URL, e.g. `https://mail.example.com/view`.
    pub viewer_url_base: String,
    /// How mark-as-read is offered.
    pub mark_action: MarkAction,
    /// Mark mail read when its page is first opened.
    pub mark_seen_on_view: bool,
    /// Time between mail polls.
    pub poll_interval: Duration,
    /// Page TTL and view limit.
    pub store: StoreConfig,
}

/// A wired bridge, ready to run.
pub struct Bridge {
    store: ContentStore,
    ingestor: Ingestor,
    mark_read: Arc<MarkReadService>,
    interactions: Arc<dyn InteractionSource>,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("store", &self.store)
            .field("ingestor", &self.ingestor)
            .finish_non_exhaustive()
    }
}

impl Bridge {
    /// Wires every component. Callbacks run on spawned Tokio tasks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`](crate::Error::Url) for an invalid viewer URL.
    pub fn new(
        config: &BridgeConfig,
        mail: Arc<dyn MailSource>,
        chat: Arc<dyn ChatNotifier>,
        interactions: Arc<dyn InteractionSource>,
    ) -> Result<Self> {
        let links = LinkBuilder::new(&config.viewer_url_base)?;
        let notifications = Arc::new(NotificationBuilder::new(
            config.chat_id,
            links,
            config.mark_action,
        ));
        let correlation = Arc::new(CorrelationCache::new());

        let events = BridgeEvents::new(
            config.mark_seen_on_view,
            Arc::clone(&mail),
            Arc::clone(&chat),
            Arc::clone(&correlation),
            Arc::clone(&notifications),
        );
        let store = ContentStore::new(
            config.store,
            Arc::new(AmmoniaSanitizer),
            Arc::new(events),
            Arc::new(TokioDispatcher),
        );

        let mark_read = Arc::new(MarkReadService::new(
            store.clone(),
            Arc::clone(&correlation),
            Arc::clone(&mail),
            Arc::clone(&chat),
            Arc::clone(&notifications),
        ));
        let ingestor = Ingestor::new(
            store.clone(),
            correlation,
            mail,
            chat,
            notifications,
            IngestSettings {
                poll_interval: config.poll_interval,
                ..IngestSettings::default()
            },
        );

        Ok(Self {
            store,
            ingestor,
            mark_read,
            interactions,
        })
    }

    /// Handle to the page store.
    #[must_use]
    pub const fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Runs polling, the chat listener and the HTTP server until `shutdown`
    /// fires, then waits for all three to stop.
    ///
    /// # Errors
    ///
    /// Returns the HTTP server's I/O error.
    pub async fn run(self, listener: TcpListener, shutdown: &broadcast::Sender<()>) -> Result<()> {
        let ingest = tokio::spawn(self.ingestor.run(shutdown.subscribe()));
        let chat = tokio::spawn(run_listener(
            self.interactions,
            Arc::clone(&self.mark_read),
            shutdown.subscribe(),
        ));

        let served = web::serve(
            listener,
            AppState::new(self.store, self.mark_read),
            shutdown.subscribe(),
        )
        .await;
        if served.is_err() {
            // Stop the background loops before reporting.
            let _ = shutdown.send(());
        }

        for (task, handle) in [("ingest", ingest), ("chat", chat)] {
            if let Err(e) = handle.await {
                tracing::error!(task, error = %e, "background task panicked");
            }
        }
        served?;
        Ok(())
    }
}
