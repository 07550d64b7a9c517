//! Envelope parse errors.

use thiserror::Error;

use crate::envelope::SignalKind;

/// Why an inbound payload was not accepted as a signal envelope.
///
/// Every variant is recoverable: the router drops the payload and keeps
/// reading from the connection.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("envelope has no signalType")]
    MissingSignalType,

    #[error("unknown signalType {0:?}")]
    UnknownSignalType(String),

    #[error("invalid {kind} envelope: {source}")]
    InvalidVariant {
        kind: SignalKind,
        #[source]
        source: serde_json::Error,
    },
}
