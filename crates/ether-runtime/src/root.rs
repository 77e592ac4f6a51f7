use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use ether_data::Value;
use tracing::warn;

use crate::channel::Channel;
use crate::com::ComShared;
use crate::device::{Device, Event};
use crate::queue::BoundedQueue;

const MAIN_LOOP_TICK: Duration = Duration::from_millis(200);

pub(crate) struct RootInner {
    pub(crate) incoming: BoundedQueue<(Channel, Value)>,
    pub(crate) outgoing: BoundedQueue<(Channel, Value)>,
    pub(crate) device: Device,
    pub(crate) coms: Mutex<Vec<Arc<ComShared>>>,
}

/// The local multiplexer that owns a set of `Com`s and the
/// application-facing `incoming`/`outgoing` queues (§4.3).
///
/// Cheap to clone: internally an `Arc`, so every com and every clone of a
/// `Root` handle shares one multiplexer.
#[derive(Clone)]
pub struct Root(Arc<RootInner>);

impl Root {
    pub fn new() -> Self {
        let inner = Arc::new(RootInner {
            incoming: BoundedQueue::default(),
            outgoing: BoundedQueue::default(),
            device: Device::new(),
            coms: Mutex::new(Vec::new()),
        });
        spawn_main_loop(inner.clone());
        Root(inner)
    }

    pub(crate) fn weak(&self) -> Weak<RootInner> {
        Arc::downgrade(&self.0)
    }

    pub(crate) fn add_com(&self, com: Arc<ComShared>) {
        self.0.coms.lock().expect("coms mutex poisoned").push(com);
    }

    /// Enqueues `(channel, value)` on `outgoing` and wakes the main loop to
    /// fan it out to every attached com.
    pub fn send(&self, channel: Channel, value: Value) {
        if let Some(dropped) = self.0.outgoing.put((channel, value)) {
            warn!(?dropped, "root outgoing queue dropped oldest item");
        }
        self.0.device.add_event(Event::NewOutgoing);
    }

    /// Blocks until a message arrives on `incoming`, or until `timeout`
    /// elapses. `None` timeout blocks indefinitely (until the root stops).
    pub async fn recv(&self, timeout: Option<Duration>) -> Option<(Channel, Value)> {
        match timeout {
            Some(d) => self.0.incoming.get(d).await,
            None => loop {
                if !self.0.device.is_active() {
                    return None;
                }
                if let Some(item) = self.0.incoming.get(Duration::from_secs(3600)).await {
                    return Some(item);
                }
            },
        }
    }

    /// Emits `stop`; the main loop then marks every com for shutdown and
    /// halts.
    pub fn stop(&self) {
        self.0.device.stop();
    }

    pub fn is_active(&self) -> bool {
        self.0.device.is_active()
    }

    pub fn com_count(&self) -> usize {
        self.0.coms.lock().expect("coms mutex poisoned").len()
    }

    /// Opts into the liveness-watcher behavior from §4.3/§9: stops this
    /// root when the process receives SIGINT, so daemon workers (coms,
    /// the main loop) do not outlive their application.
    pub fn shutdown_on_ctrl_c(&self) {
        let root = self.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            root.stop();
        });
    }
}

impl Default for Root {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_main_loop(inner: Arc<RootInner>) {
    tokio::spawn(async move {
        loop {
            match inner.device.next_event(MAIN_LOOP_TICK).await {
                Some(Event::Stop) => {
                    for com in inner.coms.lock().expect("coms mutex poisoned").iter() {
                        com.device.stop();
                    }
                    break;
                }
                Some(Event::ComStopped) => {
                    inner
                        .coms
                        .lock()
                        .expect("coms mutex poisoned")
                        .retain(|c| c.device.is_active());
                }
                Some(Event::NewIncoming) => {
                    let coms: Vec<_> = inner.coms.lock().expect("coms mutex poisoned").clone();
                    for com in coms {
                        if let Some(item) = com.incoming.try_get() {
                            if let Some(dropped) = inner.incoming.put(item) {
                                warn!(?dropped, "root incoming queue dropped oldest item");
                            }
                        }
                    }
                }
                Some(Event::NewOutgoing) => {
                    if let Some(item) = inner.outgoing.try_get() {
                        let coms: Vec<_> = inner.coms.lock().expect("coms mutex poisoned").clone();
                        for com in coms {
                            com.outgoing.put(item.clone());
                            com.device.add_event(Event::NewOutgoing);
                        }
                    }
                }
                None => {}
            }
            if !inner.device.is_active() {
                break;
            }
        }
    });
}
