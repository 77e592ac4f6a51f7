use std::sync::Arc;
use std::time::Duration;

use ether_data::{JsonX, Value};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::channel::Channel;
use crate::device::{Device, Event};
use crate::error::ComError;
use crate::queue::BoundedQueue;
use crate::root::RootInner;
use crate::transport::ServerStream;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const TICK: Duration = Duration::from_millis(200);

/// State shared by every `Com` variant: the queues the `Root` main loop
/// drives, the device driving this com's own worker, and a weak
/// back-reference so the com can signal its parent without keeping it
/// alive (§9 design note).
pub struct ComShared {
    pub incoming: BoundedQueue<(Channel, Value)>,
    pub outgoing: BoundedQueue<(Channel, Value)>,
    pub device: Device,
    pub(crate) root: std::sync::Weak<RootInner>,
}

impl ComShared {
    pub(crate) fn new(root: std::sync::Weak<RootInner>) -> Arc<Self> {
        Arc::new(Self {
            incoming: BoundedQueue::default(),
            outgoing: BoundedQueue::default(),
            device: Device::new(),
            root,
        })
    }

    fn notify_parent(&self, event: Event) {
        if let Some(root) = self.root.upgrade() {
            root.device.add_event(event);
        }
    }
}

/// Binds a listening endpoint and spawns a `HandlerCom` per accepted peer.
/// Carries no per-peer state of its own; its worker only watches for
/// `Stop`.
pub struct ServerCom {
    shared: Arc<ComShared>,
}

impl ServerCom {
    pub fn new(root: &crate::root::Root) -> Arc<Self> {
        let shared = ComShared::new(root.weak());
        root.add_com(shared.clone());
        Arc::new(Self { shared })
    }

    /// Binds `addr` and starts the accept loop as a background task. Pass
    /// `tls` to terminate TLS on accepted connections (both cert and key
    /// are required together, as `ETHER_SSL_CERT`/`ETHER_SSL_KEY` is
    /// all-or-nothing).
    pub async fn bind(
        self: Arc<Self>,
        addr: &str,
        tls: Option<tokio_rustls::TlsAcceptor>,
        root: &crate::root::Root,
    ) -> Result<std::net::SocketAddr, ComError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "ServerCom listening");
        let root = root.clone();
        let shared = self.shared.clone();
        tokio::spawn(async move {
            Self::accept_loop(listener, tls, shared, root).await;
        });
        Ok(local_addr)
    }

    async fn accept_loop(
        listener: TcpListener,
        tls: Option<tokio_rustls::TlsAcceptor>,
        shared: Arc<ComShared>,
        root: crate::root::Root,
    ) {
        loop {
            tokio::select! {
                event = shared.device.next_event(TICK) => {
                    if matches!(event, Some(Event::Stop)) {
                        break;
                    }
                }
                accepted = listener.accept() => {
                    let Ok((stream, peer)) = accepted else { continue };
                    let tls = tls.clone();
                    let root = root.clone();
                    tokio::spawn(async move {
                        if let Err(e) = accept_one(stream, tls, &root).await {
                            warn!(%peer, error = %e, "rejected incoming peer");
                        }
                    });
                }
            }
        }
        shared.device.stop();
        shared.notify_parent(Event::ComStopped);
    }
}

async fn accept_one(
    stream: tokio::net::TcpStream,
    tls: Option<tokio_rustls::TlsAcceptor>,
    root: &crate::root::Root,
) -> Result<(), ComError> {
    let server_stream = match tls {
        Some(acceptor) => ServerStream::Tls(Box::new(acceptor.accept(stream).await?)),
        None => ServerStream::Plain(stream),
    };
    let ws = tokio_tungstenite::accept_async(server_stream).await?;
    spawn_handler(ws, root);
    Ok(())
}

/// Spawns a `HandlerCom` for one accepted peer: performs the channel
/// handshake, then runs the receive/send loop until the peer disconnects
/// or the com is stopped.
fn spawn_handler<S>(ws: WebSocketStream<S>, root: &crate::root::Root)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let shared = ComShared::new(root.weak());
    root.add_com(shared.clone());
    tokio::spawn(async move {
        run_handshake_then_loop_server(shared, ws).await;
    });
}

/// `ClientCom`: initiates the connection and sends the channel hex as the
/// first frame, then runs the same send/receive loop as a `HandlerCom`.
pub struct ClientCom;

impl ClientCom {
    pub async fn connect(url: &str, channel: Channel, root: &crate::root::Root) -> Result<Arc<ComShared>, ComError> {
        let (ws, _response) = tokio_tungstenite::connect_async(url).await?;
        let shared = ComShared::new(root.weak());
        root.add_com(shared.clone());
        let task_shared = shared.clone();
        tokio::spawn(async move {
            run_handshake_then_loop_with_channel(task_shared, ws, channel).await;
        });
        Ok(shared)
    }
}

async fn run_handshake_then_loop_server<S>(shared: Arc<ComShared>, mut ws: WebSocketStream<S>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let channel = match handshake_as_server(&mut ws).await {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "handshake rejected");
            shared.device.stop();
            shared.notify_parent(Event::ComStopped);
            return;
        }
    };
    info!(%channel, "AUTH");
    run_peer_loop(shared, ws, channel).await;
}

async fn run_handshake_then_loop_with_channel<S>(
    shared: Arc<ComShared>,
    mut ws: WebSocketStream<MaybeTlsStream<S>>,
    channel: Channel,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    if let Err(e) = ws.send(Message::Text(channel.to_hex().into())).await {
        warn!(error = %e, "failed to send channel hello");
        shared.device.stop();
        shared.notify_parent(Event::ComStopped);
        return;
    }
    info!(%channel, "AUTH");
    run_peer_loop(shared, ws, channel).await;
}

/// Reads the handshake frame and validates it per §4.4: exactly 32
/// lowercase hex characters. Any deviation terminates the com.
async fn handshake_as_server<S>(ws: &mut WebSocketStream<S>) -> Result<Channel, ComError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let frame = tokio::time::timeout(HANDSHAKE_TIMEOUT, ws.next())
        .await
        .map_err(|_| ComError::HandshakeRejected("timed out waiting for channel hello".into()))?
        .ok_or(ComError::Disconnected)?
        .map_err(ComError::from)?;
    let text = match frame {
        Message::Text(t) => t,
        _ => return Err(ComError::HandshakeRejected("first frame must be a text frame".into())),
    };
    Channel::from_hex(&text).map_err(|e| ComError::HandshakeRejected(e.to_string()))
}

/// The running-state send/receive loop shared by `HandlerCom` and
/// `ClientCom`: interleaves draining `outgoing` for this com's channel
/// (triggered by `NewOutgoing`) with decoding inbound frames into
/// `incoming` (emitting `NewIncoming` on the parent).
async fn run_peer_loop<S>(shared: Arc<ComShared>, ws: WebSocketStream<S>, channel: Channel)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut write, mut read) = ws.split();
    loop {
        tokio::select! {
            event = shared.device.next_event(TICK) => {
                match event {
                    Some(Event::Stop) => break,
                    Some(Event::NewOutgoing) => {
                        while let Some((chan, value)) = shared.outgoing.try_get() {
                            if chan != channel {
                                continue;
                            }
                            match JsonX::dump(&value) {
                                Ok(text) => {
                                    if write.send(Message::Text(text.into())).await.is_err() {
                                        shared.device.stop();
                                    }
                                }
                                Err(e) => warn!(error = %e, "failed to encode outgoing value"),
                            }
                        }
                    }
                    _ => {}
                }
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => match JsonX::load(&text) {
                        Ok(value) => {
                            debug!(%channel, "new_incoming");
                            shared.incoming.put((channel, value));
                            shared.notify_parent(Event::NewIncoming);
                        }
                        Err(e) => warn!(error = %e, "INV_PKT: dropping undecodable frame"),
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "transport error, closing");
                        break;
                    }
                }
            }
        }
        if !shared.device.is_active() {
            break;
        }
    }
    let _ = write.close().await;
    shared.device.stop();
    shared.notify_parent(Event::ComStopped);
}

/// An in-process pseudo-com used by tests: ferries messages between two
/// `Root`s directly, with no socket and no handshake, standing in for a
/// real `ServerCom`/`ClientCom` pair wired over loopback TCP.
pub struct LoopbackCom;

impl LoopbackCom {
    /// Wires `channel` between `a` and `b`: anything `a` sends on that
    /// channel is delivered to `b`'s incoming queue and vice versa.
    pub fn pair(a: &crate::root::Root, b: &crate::root::Root, channel: Channel) {
        let shared_a = ComShared::new(a.weak());
        let shared_b = ComShared::new(b.weak());
        a.add_com(shared_a.clone());
        b.add_com(shared_b.clone());

        let forward = |from: Arc<ComShared>, to: Arc<ComShared>, channel: Channel| {
            tokio::spawn(async move {
                loop {
                    match from.device.next_event(TICK).await {
                        Some(Event::Stop) => break,
                        Some(Event::NewOutgoing) => {
                            while let Some((chan, value)) = from.outgoing.try_get() {
                                if chan == channel {
                                    to.incoming.put((chan, value));
                                    to.notify_parent(Event::NewIncoming);
                                }
                            }
                        }
                        _ => {}
                    }
                    if !from.device.is_active() {
                        break;
                    }
                }
                from.device.stop();
                from.notify_parent(Event::ComStopped);
            });
        };

        forward(shared_a.clone(), shared_b.clone(), channel);
        forward(shared_b, shared_a, channel);
    }
}
