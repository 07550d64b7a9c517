//! SignalRouter — per-connection lifecycle and envelope forwarding.
//!
//! Each accepted connection runs `serve` to completion on its own task:
//!
//!   1. Mint an identity and register a `PeerHandle` for it
//!   2. Send `{"userId": "<identity>"}` straight to the socket
//!   3. Hand the sink to a writer task and read frames until close/error
//!   4. Unregister and release the channel
//!
//! Forwarding stamps the sender's identity into `userId` and queues the
//! envelope on the target's handle. Nothing is ever reported back to the
//! sender: unrecognized envelopes, routing misses, and write failures are
//! logged and dropped.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use signal_protocol::{EnvelopeError, IdentityAssignment, PeerId, SignalEnvelope};
use signal_transport::{Channel, ChannelError, ConnectionHandler, Frame, FrameSink, GOING_AWAY};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::connection::Connection;
use crate::error::{ForwardError, PeerSendError};
use crate::peer::{PeerHandle, run_writer};
use crate::registry::ConnectionRegistry;

/// Router configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Capacity of each connection's outbound queue
    pub outbound_buffer: usize,
    /// How long a stalled socket may hold up identity disclosure or the
    /// final flush before the connection is abandoned
    pub write_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            outbound_buffer: 256,
            write_timeout: Duration::from_secs(2),
        }
    }
}

/// Outcome of handling one inbound payload.
#[derive(Debug)]
pub enum Dispatch {
    /// Queued on the target's channel.
    Forwarded { target: PeerId },
    /// Not a recognized envelope; dropped.
    Unrecognized(EnvelopeError),
    /// Recognized but not delivered; dropped.
    Undelivered(ForwardError),
}

impl Dispatch {
    pub fn is_forwarded(&self) -> bool {
        matches!(self, Self::Forwarded { .. })
    }
}

/// Owns the connection registry and runs the relay protocol.
pub struct SignalRouter {
    registry: ConnectionRegistry,
    config: RouterConfig,
    shutdown_tx: watch::Sender<bool>,
    /// Signalled whenever a connection finishes teardown.
    closed: Notify,
}

impl Default for SignalRouter {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl SignalRouter {
    pub fn new(config: RouterConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            registry: ConnectionRegistry::new(),
            config,
            shutdown_tx,
            closed: Notify::new(),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Run one connection from registration to teardown.
    pub async fn serve(&self, channel: Channel) {
        let (mut reader, mut writer) = channel.into_parts();
        let mut shutdown = self.shutdown_tx.subscribe();

        let stopping = *shutdown.borrow();
        if stopping {
            debug!("Refusing connection during shutdown");
            let _ = writer.send(Frame::Close(Some(GOING_AWAY))).await;
            return;
        }

        let mut conn = Connection::new(PeerId::mint());
        let id = conn.id().clone();
        let (handle, outbox) = PeerHandle::new(id.clone(), self.config.outbound_buffer);

        self.registry.add(id.clone(), handle.clone());
        if let Err(e) = conn.register() {
            error!("Connection {id}: {e}");
        }
        info!("Client connected: {id} (total: {})", self.registry.len());

        let disclosed = tokio::time::timeout(
            self.config.write_timeout,
            disclose_identity(&id, &mut writer),
        )
        .await
        .unwrap_or(Err(ChannelError::Timeout(self.config.write_timeout)));
        if let Err(e) = disclosed {
            error!("Failed to send {id} their identity, closing connection: {e}");
            drop(outbox);
            drop(writer);
            self.teardown(&mut conn, handle, None, None).await;
            return;
        }

        let writer_task = tokio::spawn(run_writer(id.clone(), writer, outbox));

        let close_code = loop {
            tokio::select! {
                frame = reader.next() => match frame {
                    Some(Ok(Frame::Text(text))) => self.handle_payload(&mut conn, text.as_bytes()),
                    Some(Ok(Frame::Binary(data))) => self.handle_payload(&mut conn, &data),
                    Some(Ok(Frame::Close(code))) => {
                        debug!("{id} closed the connection (code: {code:?})");
                        break None;
                    }
                    Some(Err(e)) => {
                        warn!("Error reading message from {id}: {e}");
                        break None;
                    }
                    None => {
                        debug!("Stream from {id} ended");
                        break None;
                    }
                },
                _ = stopped(&mut shutdown) => {
                    debug!("Closing {id} for shutdown");
                    break Some(GOING_AWAY);
                }
            }
        };

        conn.drain();
        self.teardown(&mut conn, handle, close_code, Some(writer_task)).await;
    }

    /// Classify one inbound payload and forward it if it is a recognized
    /// envelope.
    pub fn dispatch(&self, sender: &PeerId, payload: &[u8]) -> Dispatch {
        let envelope = match SignalEnvelope::parse(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                match &e {
                    EnvelopeError::Malformed(_) | EnvelopeError::InvalidVariant { .. } => {
                        warn!("Dropping envelope from {sender}: {e}")
                    }
                    _ => debug!("Dropping envelope from {sender}: {e}"),
                }
                return Dispatch::Unrecognized(e);
            }
        };

        let kind = envelope.kind();
        match self.forward(sender, envelope) {
            Ok(target) => {
                debug!("Forwarded {kind} {sender} -> {target}");
                Dispatch::Forwarded { target }
            }
            Err(e) => {
                warn!("Dropping {kind} from {sender}: {e}");
                Dispatch::Undelivered(e)
            }
        }
    }

    /// Stamp `sender` into the envelope and queue it on the addressed peer.
    /// Returns the target identity on success.
    pub fn forward(&self, sender: &PeerId, mut envelope: SignalEnvelope) -> Result<PeerId, ForwardError> {
        let target = envelope.stamp_sender(sender.clone());

        let Some(peer) = self.registry.get(&target) else {
            return Err(ForwardError::RoutingMiss(target));
        };

        let text = match envelope.to_json() {
            Ok(text) => text,
            Err(source) => return Err(ForwardError::Encode { target, source }),
        };

        match peer.send(Frame::Text(text)) {
            Ok(()) => Ok(target),
            Err(source) => Err(ForwardError::Write { target, source }),
        }
    }

    /// Close every connection and wait up to `grace` for them to tear
    /// down. Whatever is still registered afterwards is dropped.
    pub async fn shutdown(&self, grace: Duration) {
        self.shutdown_tx.send_replace(true);
        info!("Closing {} connection(s)", self.registry.len());

        let deadline = tokio::time::Instant::now() + grace;
        loop {
            let closed = self.closed.notified();
            if self.registry.is_empty() {
                break;
            }
            if tokio::time::timeout_at(deadline, closed).await.is_err() {
                let leftovers = self.registry.drain();
                warn!("Force-closing {} connection(s) after shutdown grace period", leftovers.len());
                for (id, handle) in leftovers {
                    if let Err(e) = handle.close(Some(GOING_AWAY)) {
                        debug!("No going-away close for {id}: {e}");
                    }
                }
                break;
            }
        }
    }

    // ── Internal ──────────────────────────────────────────────────────────

    fn handle_payload(&self, conn: &mut Connection, payload: &[u8]) {
        if self.dispatch(conn.id(), payload).is_forwarded() {
            conn.record_forwarded();
        } else {
            conn.record_dropped();
        }
    }

    async fn teardown(
        &self,
        conn: &mut Connection,
        handle: PeerHandle,
        close_code: Option<u16>,
        writer: Option<JoinHandle<()>>,
    ) {
        if conn.is_closed() {
            return;
        }

        let _ = self.registry.remove(conn.id());
        if close_code.is_some() {
            match handle.close(close_code) {
                Ok(()) => {}
                Err(PeerSendError::Full) => {
                    debug!("Outbound queue for {} is full, closing without a code", conn.id())
                }
                Err(PeerSendError::Disconnected) => {}
            }
        }
        // The writer exits once the last handle is gone.
        drop(handle);
        if let Some(mut writer) = writer {
            match tokio::time::timeout(self.config.write_timeout, &mut writer).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Writer task for {} failed: {e}", conn.id()),
                Err(_) => {
                    warn!(
                        "Writer for {} stalled for {:?}, abandoning the socket",
                        conn.id(),
                        self.config.write_timeout
                    );
                    writer.abort();
                }
            }
        }

        conn.close();
        info!(
            "Client disconnected: {} after {:.1?} (forwarded: {}, dropped: {}, total: {})",
            conn.id(),
            conn.uptime(),
            conn.forwarded(),
            conn.dropped(),
            self.registry.len(),
        );
        self.closed.notify_waiters();
    }
}

impl ConnectionHandler for SignalRouter {
    fn handle_connection(&self, channel: Channel) -> impl std::future::Future<Output = ()> + Send {
        self.serve(channel)
    }
}

async fn disclose_identity(id: &PeerId, writer: &mut FrameSink) -> Result<(), ChannelError> {
    let json = IdentityAssignment::new(id.clone())
        .to_json()
        .map_err(|e| ChannelError::Write(Box::new(e)))?;
    writer.send(Frame::Text(json)).await
}

async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stopping| *stopping).await;
}
