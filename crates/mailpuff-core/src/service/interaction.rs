//! Chat button listener.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use super::MarkReadService;
use crate::notify::InteractionSource;

const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Long-polls for button presses and handles them until `shutdown` fires.
///
/// Fetch errors are logged and retried after a short pause.
pub async fn run_listener(
    source: Arc<dyn InteractionSource>,
    service: Arc<MarkReadService>,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::info!("chat listener started");
    loop {
        let batch = tokio::select! {
            _ = shutdown.recv() => break,
            batch = source.next_interactions() => batch,
        };

        match batch {
            Ok(interactions) => {
                for interaction in &interactions {
                    if let Some(reply) = service.handle_interaction(interaction).await {
                        tracing::debug!(reply, "button press handled");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "fetching chat updates failed");
                tokio::select! {
                    _ = shutdown.recv() => break,
                    () = tokio::time::sleep(RETRY_DELAY) => {}
                }
            }
        }
    }
    tracing::info!("chat listener stopped");
}
