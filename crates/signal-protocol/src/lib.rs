//! Signal relay protocol types.
//!
//! Wire types shared by the router and its clients: the relay-assigned
//! identity, the one-time identity disclosure, and the two signal envelope
//! variants (`sdp` and `candidate`). Envelope content is opaque; only the
//! `signalType` tag and the `userId` address are ever interpreted.

pub mod envelope;
pub mod error;
pub mod identity;

pub use envelope::{CandidateSignal, SdpSignal, SignalEnvelope, SignalKind};
pub use error::EnvelopeError;
pub use identity::{IdentityAssignment, PeerId};
