//! Serialized write access to one connection.
//!
//! Every connection has exactly one writer task owning the sink half of its
//! channel. Everyone else (the owning read loop, forwarding peers, shutdown)
//! goes through a `PeerHandle`, which queues frames in FIFO order.

use futures_util::SinkExt;
use signal_protocol::PeerId;
use signal_transport::{Frame, FrameSink};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::PeerSendError;

/// Largest accepted outbound queue capacity.
pub const MAX_OUTBOUND_BUFFER: usize = 1 << 20;

/// Cloneable, queue-backed handle to a connection's outbound side.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    id: PeerId,
    tx: mpsc::Sender<Frame>,
}

impl PeerHandle {
    /// Create a handle and the receiving end its writer task will drain.
    /// `capacity` is clamped to `1..=MAX_OUTBOUND_BUFFER`.
    pub fn new(id: PeerId, capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.clamp(1, MAX_OUTBOUND_BUFFER));
        (Self { id, tx }, rx)
    }

    pub fn id(&self) -> &PeerId {
        &self.id
    }

    /// Queue a frame without waiting.
    pub fn send(&self, frame: Frame) -> Result<(), PeerSendError> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PeerSendError::Full,
            mpsc::error::TrySendError::Closed(_) => PeerSendError::Disconnected,
        })
    }

    /// Queue a close frame behind whatever is already queued.
    pub fn close(&self, code: Option<u16>) -> Result<(), PeerSendError> {
        self.send(Frame::Close(code))
    }
}

/// Drain queued frames into the sink until a close frame has been written,
/// the sink fails, or every handle is gone.
pub(crate) async fn run_writer(id: PeerId, mut sink: FrameSink, mut outbox: mpsc::Receiver<Frame>) {
    while let Some(frame) = outbox.recv().await {
        let closing = frame.is_close();
        if let Err(e) = sink.send(frame).await {
            debug!("Writer for {id} stopped: {e}");
            break;
        }
        if closing {
            break;
        }
    }
    outbox.close();
    let _ = sink.close().await;
}
