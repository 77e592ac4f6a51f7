use std::sync::Mutex;
use std::time::{Duration, Instant};

use ether_data::Value;
use ether_runtime::{Channel, ClientCom, ComError, Root};
use tracing::debug;

use crate::message::{CallReply, CallRequest};
use crate::ret::Ret;

const REPLY_WINDOW: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_secs(1);

fn random_msg_id() -> [u8; 16] {
    let mut id = [0u8; 16];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut id);
    id
}

/// Owns an embedded [`Root`] with one `ClientCom` on the agreed channel,
/// plus a transient buffered request accumulated by successive [`call`]
/// invocations before [`exec`] publishes it (§4.7).
///
/// [`call`]: CallClient::call
/// [`exec`]: CallClient::exec
pub struct CallClient {
    root: Root,
    channel: Channel,
    buffered: Mutex<Option<CallRequest>>,
}

impl CallClient {
    pub async fn connect(url: &str, channel: Channel) -> Result<Self, ComError> {
        let root = Root::new();
        ClientCom::connect(url, channel, &root).await?;
        Ok(Self {
            root,
            channel,
            buffered: Mutex::new(None),
        })
    }

    /// Adds `func(args)` to the batch. A fresh call rewrites `msg_id`,
    /// `service`, and `no_ret` on an already-buffered message — the latest
    /// call's settings dominate the whole batch. Returns an empty `Ret`
    /// when `buffer` is true; otherwise immediately calls [`exec`].
    ///
    /// [`exec`]: CallClient::exec
    pub async fn call(&self, service: &str, func: &str, args: Value, no_ret: bool, buffer: bool) -> Ret {
        {
            let mut guard = self.buffered.lock().expect("buffered mutex poisoned");
            match guard.as_mut() {
                Some(req) => {
                    req.msg_id = random_msg_id();
                    req.service = service.to_owned();
                    req.no_ret = no_ret;
                    req.calls.push((func.to_owned(), args));
                }
                None => {
                    *guard = Some(CallRequest {
                        msg_id: random_msg_id(),
                        service: service.to_owned(),
                        no_ret,
                        calls: vec![(func.to_owned(), args)],
                    });
                }
            }
        }

        if buffer {
            return Ret::new();
        }
        self.exec().await
    }

    /// Publishes the buffered batch. With `no_ret` set, returns
    /// immediately with one `(true, ())` entry per call and no wire
    /// round-trip wait. Otherwise waits up to 5s per attempt for a
    /// matching reply, resending the identical `msg_id` indefinitely on
    /// timeout — duplicate suppression on the server makes every resend
    /// idempotent.
    pub async fn exec(&self) -> Ret {
        let request = self
            .buffered
            .lock()
            .expect("buffered mutex poisoned")
            .take()
            .expect("exec() called with no buffered call");

        if request.no_ret {
            self.root.send(self.channel, request.to_value());
            let mut ret = Ret::new();
            for _ in &request.calls {
                ret.push(true, vec![]);
            }
            return ret;
        }

        loop {
            self.root.send(self.channel, request.to_value());
            if let Some(reply) = self.await_reply(request.msg_id).await {
                let mut ret = Ret::new();
                for (success, values) in reply.rets {
                    ret.push(success, values);
                }
                return ret;
            }
            debug!(msg_id = ?request.msg_id, "reply window elapsed, resending");
        }
    }

    async fn await_reply(&self, msg_id: [u8; 16]) -> Option<CallReply> {
        let deadline = Instant::now() + REPLY_WINDOW;
        while Instant::now() < deadline {
            let remaining = deadline.saturating_duration_since(Instant::now()).min(POLL_INTERVAL);
            let Some((_, value)) = self.root.recv(Some(remaining)).await else {
                continue;
            };
            let Some(reply) = CallReply::from_value(&value) else {
                continue;
            };
            if reply.msg_id == msg_id {
                return Some(reply);
            }
        }
        None
    }
}
