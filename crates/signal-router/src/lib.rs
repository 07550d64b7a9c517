//! Signal relay router — identity assignment, registry, and forwarding.
//!
//! `SignalRouter` implements the transport's `ConnectionHandler`: every
//! accepted connection gets a fresh identity, an entry in the shared
//! `ConnectionRegistry`, and a read loop that forwards recognized envelopes
//! to the peer they address.

pub mod connection;
pub mod error;
pub mod peer;
pub mod registry;
pub mod router;

pub use connection::{Connection, ConnectionState};
pub use error::{ForwardError, PeerSendError, TransitionError};
pub use peer::{MAX_OUTBOUND_BUFFER, PeerHandle};
pub use registry::ConnectionRegistry;
pub use router::{Dispatch, RouterConfig, SignalRouter};
