//! ConnectionRegistry — identity to live channel handle.
//!
//! Uses parking_lot::RwLock (sync) so lookups never await. Routing lookups
//! take the read lock and proceed in parallel; connect and disconnect take
//! the write lock. The lock is never held across an `.await`.

use std::collections::HashMap;

use parking_lot::RwLock;
use signal_protocol::PeerId;

use crate::peer::PeerHandle;

/// Single source of truth for which identities are currently reachable.
#[derive(Default)]
pub struct ConnectionRegistry {
    peers: RwLock<HashMap<PeerId, PeerHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `id`.
    pub fn add(&self, id: PeerId, handle: PeerHandle) {
        self.peers.write().insert(id, handle);
    }

    /// Remove the entry for `id`. Returns the removed handle; removing an
    /// absent id is a no-op.
    pub fn remove(&self, id: &PeerId) -> Option<PeerHandle> {
        self.peers.write().remove(id)
    }

    /// Look up the handle for `id`.
    pub fn get(&self, id: &PeerId) -> Option<PeerHandle> {
        self.peers.read().get(id).cloned()
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// Snapshot of the identities registered right now.
    pub fn identities(&self) -> Vec<PeerId> {
        self.peers.read().keys().cloned().collect()
    }

    /// Remove every entry (server shutdown).
    pub fn drain(&self) -> Vec<(PeerId, PeerHandle)> {
        self.peers.write().drain().collect()
    }
}
