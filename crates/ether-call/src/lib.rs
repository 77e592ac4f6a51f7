//! `ether-call`: the Call RPC layer — a batched request/reply protocol
//! carried over an `ether-runtime` channel, with at-least-once delivery on
//! the client side and duplicate suppression on the server side.

mod bound_set;
mod call_client;
mod call_server;
mod error;
mod message;
mod ret;

pub use bound_set::BoundSet;
pub use call_client::CallClient;
pub use call_server::CallServer;
pub use error::{CallError, ClientError};
pub use message::{CallReply, CallRequest};
pub use ret::Ret;
