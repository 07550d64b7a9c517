//! Per-connection lifecycle tracking.

use std::time::{Duration, Instant};

use signal_protocol::PeerId;

use crate::error::TransitionError;

/// Lifecycle of one connection with respect to the registry and read loop.
///
/// `Connecting -> Registered -> Draining -> Closed`. `Closed` is terminal,
/// and nothing ever returns to `Registered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Registered,
    Draining,
    Closed,
}

impl ConnectionState {
    fn can_transition_to(self, next: Self) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Registered) | (Connecting, Closed) | (Registered, Draining) | (Draining, Closed)
        )
    }
}

/// A connection as the router sees it.
#[derive(Debug)]
pub struct Connection {
    id: PeerId,
    state: ConnectionState,
    connected_at: Instant,
    forwarded: u64,
    dropped: u64,
}

impl Connection {
    pub fn new(id: PeerId) -> Self {
        Self {
            id,
            state: ConnectionState::Connecting,
            connected_at: Instant::now(),
            forwarded: 0,
            dropped: 0,
        }
    }

    pub fn id(&self) -> &PeerId {
        &self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    pub fn uptime(&self) -> Duration {
        self.connected_at.elapsed()
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn record_forwarded(&mut self) {
        self.forwarded += 1;
    }

    pub fn record_dropped(&mut self) {
        self.dropped += 1;
    }

    pub fn transition(&mut self, next: ConnectionState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn register(&mut self) -> Result<(), TransitionError> {
        self.transition(ConnectionState::Registered)
    }

    /// Stop reading. A no-op once draining or closed.
    pub fn drain(&mut self) {
        if self.state == ConnectionState::Registered {
            self.state = ConnectionState::Draining;
        }
    }

    /// Move to `Closed` from wherever the connection is. Returns `false` if
    /// it was already closed.
    pub fn close(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        self.drain();
        self.state = ConnectionState::Closed;
        true
    }
}
