//! Transport error types.

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure on an established message channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("read failed: {0}")]
    Read(#[source] BoxError),

    #[error("write failed: {0}")]
    Write(#[source] BoxError),

    #[error("channel closed")]
    Closed,

    #[error("write timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Failure starting the transport server.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid listen address {address}: {source}")]
    Address {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
