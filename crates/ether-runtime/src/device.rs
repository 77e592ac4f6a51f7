use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::queue::BoundedQueue;

/// The known event-loop tokens from §4.2. A stringly-typed token set in the
/// source; an enum here gets the same closed dispatch with exhaustiveness
/// checking at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Stop,
    ComStopped,
    NewIncoming,
    NewOutgoing,
}

/// Every bus participant (`Root` and each `Com`) is a `Device`: an event
/// queue plus an `active` flag. `stop()` is sticky — once cleared, `active`
/// never flips back.
pub struct Device {
    events: BoundedQueue<Event>,
    active: AtomicBool,
}

impl Device {
    pub fn new() -> Self {
        Self {
            events: BoundedQueue::new(64),
            active: AtomicBool::new(true),
        }
    }

    pub fn add_event(&self, e: Event) {
        self.events.put(e);
    }

    /// Marks the device inactive and enqueues `Stop`. Idempotent.
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.add_event(Event::Stop);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Waits up to `timeout` for the next event. `None` on elapse — this is
    /// the legal no-event tick `HandlerCom`/`ClientCom` use to poll their
    /// socket.
    pub async fn next_event(&self, timeout: Duration) -> Option<Event> {
        self.events.get(timeout).await
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new()
    }
}
