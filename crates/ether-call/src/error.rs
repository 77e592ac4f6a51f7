/// A registered function's reported failure, carried in a reply as
/// `[false, [kind, message]]`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct CallError {
    pub kind: String,
    pub message: String,
}

impl CallError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Surfaced by [`crate::Ret::capture`] when the matching call on the server
/// reported `success=false`. The statically-typed analog of the source's
/// `CallException`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} - {message}")]
pub struct ClientError {
    pub kind: String,
    pub message: String,
}
