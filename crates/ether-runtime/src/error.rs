/// Transport-level failures for a single `Com`.
///
/// Never propagated to the application: a `Com` that returns one of these
/// from its worker loop logs it and transitions to `closing`. The analog of
/// a silently-logged `socket.error` in the source.
#[derive(Debug, thiserror::Error)]
pub enum ComError {
    #[error("connect failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),
    #[error("peer disconnected")]
    Disconnected,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
