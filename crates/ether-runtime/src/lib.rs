//! `ether-runtime`: the bus runtime — bounded queues, the device/event-loop
//! model, the `Root` multiplexer, and the `ServerCom`/`HandlerCom`/
//! `ClientCom` state machines that move JSONx-encoded messages between
//! peers attached to the same channel.

mod channel;
mod com;
mod device;
mod error;
mod queue;
mod root;
mod transport;

pub use channel::Channel;
pub use com::{ClientCom, ComShared, LoopbackCom, ServerCom};
pub use device::{Device, Event};
pub use error::ComError;
pub use queue::BoundedQueue;
pub use root::Root;
pub use transport::load_tls_acceptor;
