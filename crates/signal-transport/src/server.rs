//! WebSocket transport server using Axum.
//!
//! Serves a single upgrade path, enforces the optional connection cap,
//! and hands every upgraded socket to the `ConnectionHandler`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{WebSocket, rejection::WebSocketUpgradeRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::channel::Channel;
use crate::error::TransportError;

/// Implemented by whatever owns the per-connection protocol.
/// The transport calls this once per upgraded connection and keeps the
/// connection counted until the returned future completes.
pub trait ConnectionHandler: Send + Sync + 'static {
    fn handle_connection(&self, channel: Channel) -> impl std::future::Future<Output = ()> + Send;
}

/// Transport server configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    /// Hostname to bind to
    pub hostname: String,
    /// Upgrade path
    pub path: String,
    /// Maximum concurrent connections
    pub max_connections: Option<usize>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            hostname: "0.0.0.0".into(),
            path: "/ws".into(),
            max_connections: None,
        }
    }
}

struct AppState<H: ConnectionHandler> {
    handler: Arc<H>,
    config: TransportConfig,
    client_count: AtomicUsize,
}

/// The transport server — accepts WebSocket upgrades and runs handlers.
pub struct TransportServer {
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
    port: u16,
    path: String,
}

impl TransportServer {
    /// Start the transport server. The handler is shared so the caller can
    /// keep its own reference (e.g. to shut the router down later).
    pub async fn start<H: ConnectionHandler>(
        config: TransportConfig,
        handler: Arc<H>,
    ) -> Result<Self, TransportError> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let state = Arc::new(AppState {
            handler,
            config: config.clone(),
            client_count: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route(&config.path, get(ws_upgrade_handler::<H>))
            .with_state(state);

        let address = format!("{}:{}", config.hostname, config.port);
        let addr: SocketAddr = address.parse().map_err(|source| TransportError::Address {
            address: address.clone(),
            source,
        })?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                address: address.clone(),
                source,
            })?;
        let actual_port = listener.local_addr()?.port();

        info!("Signal relay listening on ws://{}:{}{}", config.hostname, actual_port, config.path);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
            {
                warn!("Transport server exited with error: {e}");
            }
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            port: actual_port,
            path: config.path,
        })
    }

    /// Get the actual bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Stop accepting connections and wait for the listener to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("Signal relay transport stopped");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn ws_upgrade_handler<H: ConnectionHandler>(
    State(state): State<Arc<AppState<H>>>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => {
            warn!("Rejected upgrade request: {rejection}");
            return rejection.into_response();
        }
    };

    let slot = match ConnectionSlot::reserve(&state) {
        Ok(slot) => slot,
        Err(open) => {
            warn!("Connection rejected: max connections reached ({open} open)");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    };

    // A failed upgrade drops the callback, and the slot with it.
    ws.on_failed_upgrade(|e| warn!("WebSocket upgrade failed: {e}"))
        .on_upgrade(move |socket| handle_ws_connection(socket, state, slot))
}

async fn handle_ws_connection<H: ConnectionHandler>(
    socket: WebSocket,
    state: Arc<AppState<H>>,
    slot: ConnectionSlot<H>,
) {
    debug!("Socket upgraded (open sockets: {})", state.client_count.load(Ordering::Acquire));

    state.handler.handle_connection(Channel::from_websocket(socket)).await;

    drop(slot);
}

/// One unit of the live-connection count, held from the upgrade request
/// until the handler finishes.
struct ConnectionSlot<H: ConnectionHandler> {
    state: Arc<AppState<H>>,
}

impl<H: ConnectionHandler> ConnectionSlot<H> {
    /// Take a slot, or return the open count if the cap is reached.
    fn reserve(state: &Arc<AppState<H>>) -> Result<Self, usize> {
        let max = state.config.max_connections;
        state
            .client_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |open| match max {
                Some(max) if open >= max => None,
                _ => Some(open + 1),
            })?;
        Ok(Self {
            state: state.clone(),
        })
    }
}

impl<H: ConnectionHandler> Drop for ConnectionSlot<H> {
    fn drop(&mut self) {
        let open = self.state.client_count.fetch_sub(1, Ordering::AcqRel) - 1;
        debug!("Socket released (open sockets: {open})");
    }
}
