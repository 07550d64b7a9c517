//! Signal envelopes exchanged between peers through the relay.
//!
//! Inbound payloads are classified in two steps: first only the
//! `signalType` tag is read, then the payload is parsed as the matching
//! variant. Anything that fails either step is an unrecognized envelope.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EnvelopeError;
use crate::identity::PeerId;

/// Name of the discriminator field on every envelope.
pub const SIGNAL_TYPE_FIELD: &str = "signalType";

/// The known envelope tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Sdp,
    Candidate,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sdp => "sdp",
            Self::Candidate => "candidate",
        }
    }

    /// Map a tag value to a known kind. `offer`/`answer` are not known tags.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "sdp" => Some(Self::Sdp),
            "candidate" => Some(Self::Candidate),
            _ => None,
        }
    }

    /// Read just the `signalType` tag out of a parsed payload.
    fn probe(value: &Value) -> Result<Self, EnvelopeError> {
        let tag = value
            .get(SIGNAL_TYPE_FIELD)
            .ok_or(EnvelopeError::MissingSignalType)?;
        match tag.as_str() {
            Some(tag) => {
                Self::from_tag(tag).ok_or_else(|| EnvelopeError::UnknownSignalType(tag.to_owned()))
            }
            None => Err(EnvelopeError::UnknownSignalType(tag.to_string())),
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session description addressed to (or received from) a peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdpSignal {
    #[serde(rename = "userId")]
    pub user_id: PeerId,
    /// Opaque base64 session description.
    #[serde(rename = "sdp_base64", alias = "sdp")]
    pub sdp: String,
    /// Fields the relay does not know about, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Connectivity candidate addressed to (or received from) a peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSignal {
    #[serde(rename = "userId")]
    pub user_id: PeerId,
    pub candidate: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A recognized signal envelope.
///
/// `userId` is the recipient while the envelope travels client to relay,
/// and the sender once the relay has stamped it for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "signalType", rename_all = "lowercase")]
pub enum SignalEnvelope {
    Sdp(SdpSignal),
    Candidate(CandidateSignal),
}

impl SignalEnvelope {
    /// Classify and parse one inbound payload.
    pub fn parse(payload: &[u8]) -> Result<Self, EnvelopeError> {
        let mut value: Value = serde_json::from_slice(payload).map_err(EnvelopeError::Malformed)?;
        let kind = SignalKind::probe(&value)?;

        // The tag is re-emitted from the variant on serialization.
        if let Some(object) = value.as_object_mut() {
            object.remove(SIGNAL_TYPE_FIELD);
        }

        let parsed = match kind {
            SignalKind::Sdp => serde_json::from_value(value).map(Self::Sdp),
            SignalKind::Candidate => serde_json::from_value(value).map(Self::Candidate),
        };
        parsed.map_err(|source| EnvelopeError::InvalidVariant { kind, source })
    }

    pub fn kind(&self) -> SignalKind {
        match self {
            Self::Sdp(_) => SignalKind::Sdp,
            Self::Candidate(_) => SignalKind::Candidate,
        }
    }

    /// The `userId` field as it currently stands.
    pub fn user_id(&self) -> &PeerId {
        match self {
            Self::Sdp(signal) => &signal.user_id,
            Self::Candidate(signal) => &signal.user_id,
        }
    }

    /// Replace `userId` with the sender's identity, returning the address
    /// the client put there.
    pub fn stamp_sender(&mut self, sender: PeerId) -> PeerId {
        let slot = match self {
            Self::Sdp(signal) => &mut signal.user_id,
            Self::Candidate(signal) => &mut signal.user_id,
        };
        std::mem::replace(slot, sender)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
