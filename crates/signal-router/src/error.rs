//! Router error types.

use signal_protocol::PeerId;
use thiserror::Error;

use crate::connection::ConnectionState;

/// Why a frame could not be queued on a peer's channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PeerSendError {
    #[error("outbound queue is full")]
    Full,

    #[error("peer writer has shut down")]
    Disconnected,
}

/// Why a recognized envelope was not delivered.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("no live connection for {0}")]
    RoutingMiss(PeerId),

    #[error("failed to encode envelope for {target}: {source}")]
    Encode {
        target: PeerId,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write to {target}: {source}")]
    Write {
        target: PeerId,
        #[source]
        source: PeerSendError,
    },
}

/// Illegal lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal connection transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: ConnectionState,
    pub to: ConnectionState,
}
