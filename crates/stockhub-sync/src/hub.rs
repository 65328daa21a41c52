//! # Connection Hub
//!
//! The WebSocket server terminals and peripherals connect to. Every inbound
//! frame goes through the [`Router`]; every envelope the router produces is
//! published to all open connections, not just the sender.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockhub Hub Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      HubServer (Axum)                           │   │
//! │  │                                                                 │   │
//! │  │  /ws ──▶ WebSocket upgrade     /health ──▶ "OK"                │   │
//! │  │                │               /status ──▶ { clients, mode }   │   │
//! │  │                ▼                                                │   │
//! │  │      ┌─────────────────┐   frame    ┌──────────────┐           │   │
//! │  │      │  Connection     │──────────▶│   Router     │           │   │
//! │  │      │  (uuid v4)      │            └──────┬───────┘           │   │
//! │  │      └─────────────────┘                   │ Respond/Forward   │   │
//! │  │                                            ▼                    │   │
//! │  │                              ┌──────────────────────────┐      │   │
//! │  │                              │ broadcast "state changes"│      │   │
//! │  │                              └────────────┬─────────────┘      │   │
//! │  │                   ┌───────────────────────┼──────────────┐     │   │
//! │  │                   ▼                       ▼              ▼     │   │
//! │  │            ┌──────────┐           ┌──────────┐    ┌──────────┐ │   │
//! │  │            │ Terminal │           │ Terminal │    │ Tag      │ │   │
//! │  │            │ (WEB)    │           │ (WEB)    │    │ writer   │ │   │
//! │  │            └──────────┘           └──────────┘    └──────────┘ │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Per connection:                                                       │
//! │  ───────────────                                                       │
//! │  1. Subscribe to the broadcast channel, then register                  │
//! │  2. Outgoing task drains an mpsc into the socket                       │
//! │  3. Broadcast task forwards published frames to the outgoing queue     │
//! │  4. Ping task keeps the connection alive                               │
//! │  5. Receive loop routes frames until close, error or shutdown          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The hub state is the only owner of the connection set; the router never
//! sees a socket.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
    routing::get,
    Json,
};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio::time::interval;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ServerSettings;
use crate::error::{SyncError, SyncResult};
use crate::protocol::Envelope;
use crate::router::Router;

// =============================================================================
// Connected Client
// =============================================================================

/// One open WebSocket connection.
#[derive(Debug, Clone)]
pub struct ConnectedClient {
    /// Connection id (UUID v4), assigned on upgrade.
    pub id: String,
    /// Peer address.
    pub addr: SocketAddr,
    pub connected_at: DateTime<Utc>,
}

/// Body of `GET /status`.
#[derive(Debug, Clone, Serialize)]
pub struct HubStatus {
    pub connected_clients: usize,
    pub mode: Option<String>,
}

// =============================================================================
// Hub State
// =============================================================================

/// Shared state for the hub server.
pub struct HubState {
    settings: ServerSettings,
    router: Router,
    /// Connected clients, keyed by connection id.
    clients: RwLock<HashMap<String, ConnectedClient>>,
    /// The "state changes" topic. Frames are serialized once, before fan-out.
    broadcast_tx: broadcast::Sender<Utf8Bytes>,
    /// Flips to true when the hub shuts down; open connections close.
    closing_tx: watch::Sender<bool>,
}

impl HubState {
    fn new(settings: ServerSettings, router: Router) -> Self {
        let (broadcast_tx, _) = broadcast::channel(settings.broadcast_capacity);
        let (closing_tx, _) = watch::channel(false);
        HubState {
            settings,
            router,
            clients: RwLock::new(HashMap::new()),
            broadcast_tx,
            closing_tx,
        }
    }

    /// Publishes an envelope to every subscriber.
    ///
    /// Returns how many connections it was queued for.
    pub fn publish(&self, envelope: &Envelope) -> SyncResult<usize> {
        let json = envelope.to_json()?;
        // No subscribers is not an error: nobody is listening yet
        Ok(self.broadcast_tx.send(Utf8Bytes::from(json)).unwrap_or(0))
    }

    /// Returns the number of connected clients.
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Returns a list of connected client IDs.
    pub async fn client_ids(&self) -> Vec<String> {
        self.clients.read().await.keys().cloned().collect()
    }

    pub async fn status(&self) -> HubStatus {
        HubStatus {
            connected_clients: self.client_count().await,
            mode: self.router.mode().get().await,
        }
    }
}

// =============================================================================
// Hub Server
// =============================================================================

/// The hub server that accepts WebSocket connections.
pub struct HubServer {
    state: Arc<HubState>,
}

/// Handle for controlling a started hub server.
#[derive(Clone)]
pub struct HubHandle {
    state: Arc<HubState>,
    local_addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
}

impl HubHandle {
    /// Publishes an envelope to all connected clients.
    pub fn publish(&self, envelope: &Envelope) -> SyncResult<usize> {
        self.state.publish(envelope)
    }

    /// Returns the number of connected clients.
    pub async fn client_count(&self) -> usize {
        self.state.client_count().await
    }

    /// Returns a list of connected client IDs.
    pub async fn client_ids(&self) -> Vec<String> {
        self.state.client_ids().await
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Closes open connections and stops accepting new ones.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.state.closing_tx.send_replace(true);
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ChannelError("Hub shutdown channel closed".into()))
    }
}

impl HubServer {
    /// Creates a new hub server.
    pub fn new(settings: ServerSettings, router: Router) -> Self {
        HubServer {
            state: Arc::new(HubState::new(settings, router)),
        }
    }

    /// Binds the listener, starts serving and returns a handle.
    pub async fn start(self) -> SyncResult<HubHandle> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let app = axum::Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/status", get(status_handler))
            .with_state(self.state.clone());

        let bind_addr = self.state.settings.bind_address();
        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            SyncError::TransportError(format!("Failed to bind to {}: {}", bind_addr, e))
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| SyncError::TransportError(e.to_string()))?;

        info!(addr = %local_addr, "Hub server started");

        tokio::spawn(async move {
            let served = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                shutdown_rx.recv().await;
                info!("Hub server shutting down");
            })
            .await;

            if let Err(e) = served {
                error!(error = %e, "Hub server stopped with an error");
            }
        });

        Ok(HubHandle {
            state: self.state,
            local_addr,
            shutdown_tx,
        })
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    "OK"
}

async fn status_handler(State(state): State<Arc<HubState>>) -> Json<HubStatus> {
    Json(state.status().await)
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<HubState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    debug!(addr = %addr, "WebSocket upgrade requested");
    ws.max_message_size(state.settings.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state, addr))
}

// =============================================================================
// Connection Handling
// =============================================================================

/// Handles a WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<HubState>, addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();
    let connection_id = Uuid::new_v4().to_string();

    // Subscribe first: once a client is counted it receives every publish
    let mut broadcast_rx = state.broadcast_tx.subscribe();
    let mut closing_rx = state.closing_tx.subscribe();

    state.clients.write().await.insert(
        connection_id.clone(),
        ConnectedClient {
            id: connection_id.clone(),
            addr,
            connected_at: Utc::now(),
        },
    );
    info!(connection_id = %connection_id, addr = %addr, "Client connected");

    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(64);

    // Outgoing message task
    let outgoing_handle = tokio::spawn(async move {
        while let Some(msg) = outgoing_rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Broadcast forwarding task
    let outgoing_tx_broadcast = outgoing_tx.clone();
    let lagging_id = connection_id.clone();
    let broadcast_handle = tokio::spawn(async move {
        loop {
            match broadcast_rx.recv().await {
                Ok(frame) => {
                    if outgoing_tx_broadcast.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(connection_id = %lagging_id, skipped, "Broadcast receiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Ping task
    let outgoing_tx_ping = outgoing_tx.clone();
    let ping_every = state.settings.ping_interval();
    let ping_handle = tokio::spawn(async move {
        let mut ping_interval = interval(ping_every);
        loop {
            ping_interval.tick().await;
            if outgoing_tx_ping
                .send(Message::Ping(axum::body::Bytes::new()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Main receive loop
    loop {
        let next = tokio::select! {
            next = receiver.next() => Some(next),
            _ = closing(&mut closing_rx) => None,
        };
        let Some(next) = next else {
            let _ = outgoing_tx.send(Message::Close(None)).await;
            info!(connection_id = %connection_id, "Closing connection for shutdown");
            break;
        };

        match next {
            Some(Ok(Message::Text(text))) => {
                route_frame(&state, &connection_id, text.as_str()).await;
            }
            Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                Ok(text) => route_frame(&state, &connection_id, text).await,
                Err(e) => {
                    warn!(connection_id = %connection_id, error = %e, "Dropping non-UTF-8 binary frame");
                }
            },
            Some(Ok(Message::Pong(_))) => {
                // Connection is alive
            }
            Some(Ok(Message::Ping(data))) => {
                let _ = outgoing_tx.send(Message::Pong(data)).await;
            }
            Some(Ok(Message::Close(_))) => {
                info!(connection_id = %connection_id, "Client requested close");
                break;
            }
            Some(Err(e)) => {
                warn!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
            None => {
                info!(connection_id = %connection_id, "Client disconnected");
                break;
            }
        }
    }

    // Cleanup
    ping_handle.abort();
    broadcast_handle.abort();
    remove_client(&state, &connection_id).await;

    // Let a queued Close frame go out before the sender is dropped
    drop(outgoing_tx);
    let _ = outgoing_handle.await;
}

/// Resolves once the hub starts shutting down.
async fn closing(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|closing| *closing).await;
}

/// Routes one frame and publishes whatever it produced.
async fn route_frame(state: &HubState, connection_id: &str, frame: &str) {
    debug!(connection_id = %connection_id, bytes = frame.len(), "Frame received");

    let Some(envelope) = state.router.route(frame).await.into_envelope() else {
        return;
    };

    match state.publish(&envelope) {
        Ok(receivers) => {
            debug!(action = %envelope.action, receivers, "Envelope published");
        }
        Err(e) => {
            error!(action = %envelope.action, error = %e, "Failed to publish envelope");
        }
    }
}

/// Removes a client from the connected list.
async fn remove_client(state: &HubState, connection_id: &str) {
    let mut clients = state.clients.write().await;
    if clients.remove(connection_id).is_some() {
        info!(connection_id = %connection_id, "Client removed");
    }
}
