//! Recording fakes for the mail and chat collaborators.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mailpuff_imap::Uid;

use crate::error::{ChatError, MailError};
use crate::mail::{MailSession, MailSource};
use crate::notify::{Button, ChatNotifier, Notification};
use crate::store::NotificationRef;

pub(crate) fn uid(n: u32) -> Uid {
    Uid::new(n).unwrap()
}

#[derive(Default)]
pub(crate) struct MailState {
    pub messages: Mutex<BTreeMap<Uid, Vec<u8>>>,
    pub seen: Mutex<Vec<Uid>>,
    pub fail_connect: AtomicBool,
    pub fail_mark: AtomicBool,
    pub connects: AtomicUsize,
    pub closes: AtomicUsize,
}

/// In-memory mailbox; `\Seen` marks are recorded, never applied to listing.
#[derive(Clone, Default)]
pub(crate) struct FakeMail {
    pub state: Arc<MailState>,
}

impl FakeMail {
    pub fn with_messages(messages: &[(u32, &str)]) -> Self {
        let fake = Self::default();
        {
            let mut stored = fake.state.messages.lock().unwrap();
            for (n, raw) in messages {
                stored.insert(uid(*n), raw.as_bytes().to_vec());
            }
        }
        fake
    }

    pub fn seen(&self) -> Vec<Uid> {
        self.state.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailSource for FakeMail {
    async fn connect(&self) -> Result<Box<dyn MailSession>, MailError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(MailError::Other("connection refused".to_string()));
        }
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSession {
    state: Arc<MailState>,
}

#[async_trait]
impl MailSession for FakeSession {
    async fn list_unseen(&mut self) -> Result<Vec<Uid>, MailError> {
        let seen = self.state.seen.lock().unwrap().clone();
        Ok(self
            .state
            .messages
            .lock()
            .unwrap()
            .keys()
            .filter(|uid| !seen.contains(uid))
            .copied()
            .collect())
    }

    async fn fetch(&mut self, uids: &[Uid]) -> Result<BTreeMap<Uid, Vec<u8>>, MailError> {
        let messages = self.state.messages.lock().unwrap();
        Ok(uids
            .iter()
            .filter_map(|uid| messages.get(uid).map(|raw| (*uid, raw.clone())))
            .collect())
    }

    async fn mark_seen(&mut self, uid: Uid) -> Result<(), MailError> {
        if self.state.fail_mark.load(Ordering::SeqCst) {
            return Err(MailError::Other("store rejected".to_string()));
        }
        self.state.seen.lock().unwrap().push(uid);
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), MailError> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Records everything posted to the chat.
#[derive(Default)]
pub(crate) struct FakeChat {
    pub sent: Mutex<Vec<Notification>>,
    pub updates: Mutex<Vec<(NotificationRef, Vec<Button>)>>,
    pub acks: Mutex<Vec<(String, String)>>,
    pub fail_send: AtomicBool,
    next_message_id: AtomicI64,
}

impl FakeChat {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(NotificationRef, Vec<Button>)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn acks(&self) -> Vec<(String, String)> {
        self.acks.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatNotifier for FakeChat {
    async fn send_notification(
        &self,
        notification: &Notification,
    ) -> Result<NotificationRef, ChatError> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(ChatError::Other("chat unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(NotificationRef {
            chat_id: notification.chat_id,
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1,
        })
    }

    async fn update_buttons(
        &self,
        target: NotificationRef,
        buttons: &[Button],
    ) -> Result<(), ChatError> {
        self.updates.lock().unwrap().push((target, buttons.to_vec()));
        Ok(())
    }

    async fn acknowledge_interaction(
        &self,
        interaction_id: &str,
        text: &str,
    ) -> Result<(), ChatError> {
        self.acks
            .lock()
            .unwrap()
            .push((interaction_id.to_string(), text.to_string()));
        Ok(())
    }
}
