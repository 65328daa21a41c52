//! # Sync Error Types
//!
//! Error types for the hub, the router and configuration loading.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  TransportError │  │  ProtocolError          │ │
//! │  │  ConfigLoad...  │  │  ChannelError   │  │  SerializationFailed    │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │    Database     │  │    Lifecycle    │                              │
//! │  │                 │  │                 │                              │
//! │  │  DatabaseError  │  │  ShuttingDown   │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Request-level failures (a missing product, a foreign-key violation) are
//! not `SyncError`s: the router turns them into `FAILURE` envelopes. These
//! variants cover the process around the router.

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Failures of the hub process, its configuration and its transport.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration values that cannot run.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Socket bind/accept/serve failure.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Frame that does not follow the envelope protocol.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Failed to serialize an outbound envelope.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    // =========================================================================
    // Database Errors
    // =========================================================================
    /// Store failure outside a request (startup, shutdown).
    #[error("Database error: {0}")]
    DatabaseError(String),

    // =========================================================================
    // Lifecycle
    // =========================================================================
    /// Hub is shutting down.
    #[error("Hub is shutting down")]
    ShuttingDown,
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<stockhub_db::DbError> for SyncError {
    fn from(err: stockhub_db::DbError) -> Self {
        SyncError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_) | SyncError::ConfigLoadFailed(_)
        )
    }

    /// Returns true if this error indicates a protocol mismatch.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            SyncError::ProtocolError(_) | SyncError::SerializationFailed(_)
        )
    }
}
