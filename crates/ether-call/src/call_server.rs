use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ether_data::Value;
use ether_runtime::{Channel, ClientCom, ComError, Root};
use tracing::{debug, warn};

use crate::bound_set::BoundSet;
use crate::error::CallError;
use crate::message::{CallReply, CallRequest};

type RegisteredFn = Box<dyn Fn(&Value) -> Result<Vec<Value>, CallError> + Send + Sync>;

/// Caches the reply already computed for a `msg_id`, so a resent request —
/// the exact "first reply lost in flight" scenario spec.md §8's
/// "at-least-once" property describes — gets its original reply resent
/// instead of silently dropped a second time. `None` marks a `no_ret`
/// request (or one dropped for an unregistered function): recognized as a
/// duplicate, but there was never a reply to resend. Bounded and
/// TTL-evicted in lockstep with `BoundSet`'s own dedup window, via the same
/// two-phase collect-then-delete pass (§9's mutate-while-iterating bug).
struct ReplyCache {
    ttl: Duration,
    max_size: usize,
    entries: Mutex<HashMap<[u8; 16], (Instant, Option<(Channel, CallReply)>)>>,
}

impl ReplyCache {
    fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            ttl,
            max_size,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get(&self, msg_id: [u8; 16]) -> Option<(Channel, CallReply)> {
        self.entries
            .lock()
            .expect("reply cache mutex poisoned")
            .get(&msg_id)
            .and_then(|(_, reply)| reply.clone())
    }

    fn insert(&self, msg_id: [u8; 16], reply: Option<(Channel, CallReply)>) {
        let mut entries = self.entries.lock().expect("reply cache mutex poisoned");
        entries.insert(msg_id, (Instant::now(), reply));

        if entries.len() > self.max_size {
            let now = Instant::now();
            let ttl = self.ttl;
            let expired: Vec<[u8; 16]> = entries
                .iter()
                .filter(|(_, (ts, _))| now.duration_since(*ts) > ttl)
                .map(|(k, _)| *k)
                .collect();
            for key in expired {
                entries.remove(&key);
            }
        }
    }
}

/// Hosts a named service's registered functions behind a single channel.
/// Owns an embedded [`Root`] with one `ClientCom` to the relay, a
/// [`BoundSet`] deduplicating `msg_id`s so a resent request is never
/// re-executed, and a [`ReplyCache`] so a resend still gets a reply (§4.6).
pub struct CallServer {
    service: String,
    channel: Channel,
    root: Root,
    registry: Mutex<HashMap<String, RegisteredFn>>,
    seen: BoundSet,
    replies: ReplyCache,
}

impl CallServer {
    pub async fn connect(url: &str, channel: Channel, service: impl Into<String>) -> Result<Arc<Self>, ComError> {
        let root = Root::new();
        ClientCom::connect(url, channel, &root).await?;
        Ok(Arc::new(Self {
            service: service.into(),
            channel,
            root,
            registry: Mutex::new(HashMap::new()),
            seen: BoundSet::default(),
            replies: ReplyCache::new(crate::bound_set::DEFAULT_TTL, crate::bound_set::DEFAULT_MAX_SIZE),
        }))
    }

    /// Registers `name` so that an incoming call naming it invokes `f`
    /// with the call's `args_map`. Registering the same name twice
    /// replaces the previous registration.
    pub fn register(
        &self,
        name: impl Into<String>,
        f: impl Fn(&Value) -> Result<Vec<Value>, CallError> + Send + Sync + 'static,
    ) {
        self.registry.lock().expect("registry mutex poisoned").insert(name.into(), Box::new(f));
    }

    /// Runs the receive/dispatch loop in a background task until the
    /// embedded root is stopped.
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.run().await })
    }

    pub fn stop(&self) {
        self.root.stop();
    }

    async fn run(self: Arc<Self>) {
        loop {
            if !self.root.is_active() {
                break;
            }
            let Some((channel, value)) = self.root.recv(Some(Duration::from_secs(1))).await else {
                continue;
            };

            let Some(request) = CallRequest::from_value(&value) else {
                debug!("dropping malformed call request");
                continue;
            };
            if request.service != self.service {
                continue;
            }
            if self.seen.check(request.msg_id) {
                match self.replies.get(request.msg_id) {
                    Some((reply_channel, reply)) => {
                        debug!(msg_id = ?request.msg_id, "duplicate msg_id, resending cached reply");
                        self.root.send(reply_channel, reply.to_value());
                    }
                    None => {
                        debug!(msg_id = ?request.msg_id, "duplicate msg_id, no cached reply to resend");
                    }
                }
                continue;
            }

            let mut rets = Vec::with_capacity(request.calls.len());
            let mut aborted = false;
            for (func_name, args) in &request.calls {
                let handler = self.registry.lock().expect("registry mutex poisoned").get(func_name).is_some();
                if !handler {
                    warn!(func = %func_name, "unregistered function, dropping whole request");
                    aborted = true;
                    break;
                }
                let result = {
                    let registry = self.registry.lock().expect("registry mutex poisoned");
                    let f = registry.get(func_name).expect("checked above");
                    f(args)
                };
                match result {
                    Ok(values) => rets.push((true, values)),
                    Err(e) => rets.push((false, vec![Value::str(e.kind.clone()), Value::str(e.message.clone())])),
                }
            }

            if aborted || request.no_ret {
                self.replies.insert(request.msg_id, None);
                continue;
            }

            let reply = CallReply { msg_id: request.msg_id, rets };
            self.replies.insert(request.msg_id, Some((channel, reply.clone())));
            self.root.send(channel, reply.to_value());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_error_renders_kind_and_message() {
        let e = CallError::new("ValueError", "bad");
        assert_eq!(e.to_string(), "ValueError: bad");
    }
}
