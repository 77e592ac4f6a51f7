use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;

/// A drop-head bounded FIFO, the analog of the source's blocking queue.
///
/// `put` never blocks: once `max_size` items are held, the oldest is
/// discarded to make room for the newest. `get` waits (with a timeout) for
/// the queue to become non-empty rather than polling.
pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    max_size: usize,
    non_empty: Notify,
}

pub const DEFAULT_MAX_SIZE: usize = 1000;

impl<T> BoundedQueue<T> {
    pub fn new(max_size: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            max_size,
            non_empty: Notify::new(),
        }
    }

    /// Pushes `item`, dropping the oldest entry first if already at
    /// capacity. Returns the dropped item, if any, so callers can log it.
    pub fn put(&self, item: T) -> Option<T> {
        let mut items = self.items.lock().expect("queue mutex poisoned");
        let dropped = if items.len() >= self.max_size {
            items.pop_front()
        } else {
            None
        };
        items.push_back(item);
        drop(items);
        self.non_empty.notify_waiters();
        dropped
    }

    /// Pops the oldest item if one is present, without waiting.
    pub fn try_get(&self) -> Option<T> {
        self.items.lock().expect("queue mutex poisoned").pop_front()
    }

    /// Waits up to `timeout` for an item, returning `None` on elapse.
    ///
    /// Subscribes to the notifier before re-checking the queue so a `put`
    /// racing with this call is never missed.
    pub async fn get(&self, timeout: Duration) -> Option<T> {
        loop {
            let notified = self.non_empty.notified();
            if let Some(item) = self.try_get() {
                return Some(item);
            }
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(item) = self.try_get() {
                return Some(item);
            }
            if tokio::time::timeout(timeout, notified).await.is_err() {
                return self.try_get();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("queue mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for BoundedQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE)
    }
}
