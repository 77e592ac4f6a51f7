/// Decode/encode failures from the JSONx codec.
///
/// The Rust analog of `cent.data.exc.DataException`: every malformed-input
/// path in [`crate::jsonx`] returns one of these instead of panicking.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("root value must serialize as a JSON array or object")]
    RootNotContainer,
    #[error("unknown jsonx escape marker: {0}")]
    UnknownEscape(String),
    #[error("map key must be a string to encode as JSON")]
    NonStringMapKey,
    #[error("invalid hex in bytes escape: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("custom type not registered: {0}")]
    UnregisteredCustom(String),
    #[error("channel must be exactly 32 lowercase hex characters: {0:?}")]
    InvalidChannelHex(String),
    #[error("__jsonx__ escape array is malformed")]
    MalformedEscape,
}
