//! Callback execution contexts.
//!
//! The store never runs lifecycle callbacks itself: it hands them to a
//! [`Dispatcher`] after its lock is released.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

/// A boxed callback invocation.
pub type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Runs callback tasks somewhere other than the caller's stack.
pub trait Dispatcher: Send + Sync {
    /// Schedules `task`; must not block.
    fn dispatch(&self, task: Task);
}

/// Spawns every task on the current Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDispatcher;

impl Dispatcher for TokioDispatcher {
    fn dispatch(&self, task: Task) {
        tokio::spawn(task);
    }
}

/// Queues tasks until [`drain`](Self::drain) runs them.
///
/// Makes callback timing deterministic in tests.
#[derive(Default)]
pub struct QueueDispatcher {
    queue: Mutex<VecDeque<Task>>,
}

impl QueueDispatcher {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Runs queued tasks in order, including ones queued while draining.
    ///
    /// Returns how many ran.
    pub async fn drain(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self
                .queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            let Some(task) = next else {
                return ran;
            };
            task.await;
            ran += 1;
        }
    }
}

impl Dispatcher for QueueDispatcher {
    fn dispatch(&self, task: Task) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(task);
    }
}

impl std::fmt::Debug for QueueDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueDispatcher")
            .field("pending", &self.pending())
            .finish()
    }
}
