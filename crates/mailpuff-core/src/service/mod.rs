//! Bridge services wiring the store to the mail and chat collaborators.

mod events;
mod ingest;
mod interaction;
mod mark_read;

pub use events::BridgeEvents;
pub use ingest::{IngestSettings, Ingestor, PollReport};
pub use interaction::run_listener;
pub use mark_read::{MarkReadOutcome, MarkReadService};

use crate::notify::{ChatNotifier, MarkAction, NotificationBuilder};
use crate::store::{NotificationRef, PageInfo};

/// Replaces a notification's keyboard with the single view button.
async fn retire_mark_button(
    chat: &dyn ChatNotifier,
    notifications: &NotificationBuilder,
    target: NotificationRef,
    page: &PageInfo,
) {
    if notifications.mark_action() == MarkAction::Off {
        return;
    }
    let buttons = notifications.view_only(&page.id, &page.token);
    if let Err(e) = chat.update_buttons(target, &buttons).await {
        tracing::warn!(
            error = %e,
            chat_id = target.chat_id,
            msg_id = target.message_id,
            "failed to update notification buttons"
        );
    }
}
