//! Signal relay transport layer.
//!
//! Accepts HTTP upgrade requests on a single path and hands every upgraded
//! WebSocket to a `ConnectionHandler` as a `Channel`: a stream of inbound
//! frames plus a sink for outbound ones. The transport knows nothing about
//! identities or envelopes.

pub mod channel;
pub mod error;
pub mod server;

pub use channel::{Channel, Frame, FrameSink, FrameStream, GOING_AWAY, NORMAL_CLOSURE};
pub use error::{ChannelError, TransportError};
pub use server::{ConnectionHandler, TransportConfig, TransportServer};
