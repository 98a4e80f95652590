//! In-memory dispatch queue.
//!
//! Only dispatches within a single process; for development and tests. The
//! mutex around the deque makes each pop atomic, so concurrent consumers
//! never receive the same signal.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::{self, Instant};

use jobhub_core::result::AppResult;
use jobhub_entity::job::DispatchSignal;

use crate::store::QueueStore;

/// In-memory FIFO queue store.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    /// Waiting signals, head at the front.
    signals: Mutex<VecDeque<DispatchSignal>>,
    /// Wakes one blocked consumer per push.
    notify: Notify,
}

impl MemoryQueueStore {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            signals: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    fn try_pop(&self) -> Option<DispatchSignal> {
        let mut signals = self.signals.lock().expect("queue mutex poisoned");
        let popped = signals.pop_front();
        // A notification may have been consumed by a consumer that timed out;
        // chain a wakeup so remaining signals are not stranded until the next
        // pop deadline.
        if popped.is_some() && !signals.is_empty() {
            self.notify.notify_one();
        }
        popped
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn push(&self, signal: &DispatchSignal) -> AppResult<()> {
        self.signals
            .lock()
            .expect("queue mutex poisoned")
            .push_back(signal.clone());
        self.notify.notify_one();
        Ok(())
    }

    async fn pop_blocking(&self, timeout: Duration) -> AppResult<Option<DispatchSignal>> {
        let deadline = Instant::now() + timeout;

        loop {
            // Register for a wakeup before the emptiness check so a push
            // between the check and the await is not lost.
            let notified = self.notify.notified();

            if let Some(signal) = self.try_pop() {
                return Ok(Some(signal));
            }

            if time::timeout_at(deadline, notified).await.is_err() {
                // Timed out; one last check in case a push raced the deadline.
                return Ok(self.try_pop());
            }
        }
    }

    async fn len(&self) -> AppResult<u64> {
        Ok(self.signals.lock().expect("queue mutex poisoned").len() as u64)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
