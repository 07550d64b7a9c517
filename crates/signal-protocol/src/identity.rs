//! Relay-assigned peer identities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identity the relay assigns to a connection when it is accepted.
///
/// Identities are minted by the relay only. Clients use them as addresses
/// in the `userId` field of outbound envelopes, and see them as the sender
/// of every envelope they receive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Mint a fresh random identity (UUID v4).
    pub fn mint() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PeerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// First message on every connection: `{"userId": "<assigned identity>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityAssignment {
    #[serde(rename = "userId")]
    pub user_id: PeerId,
}

impl IdentityAssignment {
    pub fn new(user_id: PeerId) -> Self {
        Self { user_id }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
