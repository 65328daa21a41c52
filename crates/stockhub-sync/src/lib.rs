//! # stockhub-sync: Wire Protocol, Router and Hub for Stockhub
//!
//! This crate keeps every connected terminal's view of the catalog and the
//! stock ledger live. Terminals send JSON envelopes over one WebSocket; the
//! router applies them to the store and the hub broadcasts each result to
//! every open connection.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockhub Hub Architecture                        │
//! │                                                                         │
//! │  ┌──────────┐  ┌──────────┐  ┌──────────┐                              │
//! │  │ Terminal │  │ Terminal │  │ Tag      │   WebSocket clients          │
//! │  │ (WEB)    │  │ (WEB)    │  │ writer   │                              │
//! │  └────┬─────┘  └────┬─────┘  └────┬─────┘                              │
//! │       └─────────────┼─────────────┘                                     │
//! │                     ▼                                                   │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                    HubServer (hub.rs)                            │  │
//! │  │  connection set · broadcast topic · /health · /status            │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │ frame            ▲ RouteOutcome        │
//! │                               ▼                  │                      │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                    Router (router.rs)                            │  │
//! │  │  Envelope (protocol.rs) → repositories / reconciler              │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               ▼                                         │
//! │                        stockhub-db (SQLite)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Server configuration (TOML file + environment)
//! - [`error`] - Sync error types
//! - [`hub`] - Axum WebSocket server and broadcast fan-out
//! - [`protocol`] - Envelope, actions and payloads
//! - [`router`] - Envelope dispatch and named drop outcomes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockhub_sync::{HubServer, ModeFlag, Router, ServerConfig};
//! use stockhub_db::Database;
//!
//! let config = ServerConfig::load(None)?;
//! let db = Database::new(config.to_db_config()).await?;
//!
//! let router = Router::new(db.clone(), ModeFlag::default());
//! let hub = HubServer::new(config.server.clone(), router).start().await?;
//! println!("Listening on {}", hub.local_addr());
//!
//! // ...
//! hub.shutdown().await?;
//! db.close().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod hub;
pub mod protocol;
pub mod router;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DatabaseSettings, ServerConfig, ServerSettings, StockSettings};
pub use error::{SyncError, SyncResult};
pub use hub::{HubHandle, HubServer, HubStatus};
pub use protocol::{Action, Component, Envelope, ErrorCode, MessageType, ResponsePayload, Status};
pub use router::{DropReason, ModeFlag, RouteOutcome, Router};
