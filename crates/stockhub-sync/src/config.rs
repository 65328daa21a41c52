//! # Server Configuration
//!
//! Configuration for the hub process: where it listens, which database it
//! opens, and which stock policy movements follow.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOCKHUB_PORT=9000                                                 │
//! │     STOCKHUB_DB_PATH=/var/lib/stockhub/stockhub.db                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $STOCKHUB_CONFIG, or                                               │
//! │     ~/.config/stockhub/stockhub.toml (Linux)                           │
//! │     ~/Library/Application Support/com.stockhub.stockhub/... (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     0.0.0.0:8000, ./stockhub.db, strict stock gate                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # stockhub.toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 8000
//! max_message_size = 1048576
//! ping_interval_secs = 30
//! broadcast_capacity = 256
//!
//! [database]
//! path = "./stockhub.db"
//! max_connections = 1
//!
//! [stock]
//! gate = "strict"  # strict | relaxed
//! ```
//!
//! ## Environment Variables
//! | Variable | Overrides |
//! |---|---|
//! | `STOCKHUB_CONFIG` | config file path |
//! | `STOCKHUB_BIND_ADDR` | `server.bind_addr` |
//! | `PORT`, `STOCKHUB_PORT` | `server.port` (`STOCKHUB_PORT` wins) |
//! | `STOCKHUB_DB_PATH` | `database.path` |
//! | `STOCKHUB_STOCK_GATE` | `stock.gate` |
//! | `STOCKHUB_BROADCAST_CAPACITY` | `server.broadcast_capacity` |

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use stockhub_core::StockGate;
use stockhub_db::DbConfig;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "STOCKHUB_CONFIG";

// =============================================================================
// Server Settings
// =============================================================================

/// Listener and connection settings for the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Interface to bind. `0.0.0.0` accepts terminals on the LAN.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Port for the WebSocket endpoint and the HTTP probes.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest inbound frame accepted (bytes).
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Keep-alive ping interval (seconds).
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,

    /// Envelopes buffered per subscriber before it starts lagging.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_message_size() -> usize {
    1024 * 1024 // 1 MiB
}

fn default_ping_interval() -> u64 {
    30
}

fn default_broadcast_capacity() -> usize {
    256
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
            max_message_size: default_max_message_size(),
            ping_interval_secs: default_ping_interval(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

impl ServerSettings {
    /// Returns the socket address string to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }
}

// =============================================================================
// Database Settings
// =============================================================================

/// Store location and pool size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file, or `:memory:` for a throwaway store.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Pool size. One shared session unless raised.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./stockhub.db")
}

fn default_max_connections() -> u32 {
    1
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Stock Settings
// =============================================================================

/// Stock movement policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSettings {
    #[serde(default)]
    pub gate: StockGate,
}

// =============================================================================
// Main Server Configuration
// =============================================================================

/// Complete hub configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub stock: StockSettings,
}

impl ServerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, `$STOCKHUB_CONFIG`, or the platform
    ///    config directory)
    /// 3. Environment variables
    ///
    /// A missing file is not an error; an unreadable or malformed one is.
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
            .or_else(Self::default_config_path);

        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document; absent sections and keys take their defaults.
    pub fn from_toml(contents: &str) -> SyncResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.server.bind_addr.trim().is_empty() {
            return Err(SyncError::InvalidConfig("server.bind_addr is empty".into()));
        }

        if self.server.max_message_size == 0 {
            return Err(SyncError::InvalidConfig(
                "server.max_message_size must be greater than 0".into(),
            ));
        }

        if self.server.ping_interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "server.ping_interval_secs must be greater than 0".into(),
            ));
        }

        if self.server.broadcast_capacity == 0 {
            return Err(SyncError::InvalidConfig(
                "server.broadcast_capacity must be greater than 0".into(),
            ));
        }

        if self.database.path.as_os_str().is_empty() {
            return Err(SyncError::InvalidConfig("database.path is empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(SyncError::InvalidConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Builds the store configuration from these settings.
    pub fn to_db_config(&self) -> DbConfig {
        let config = if self.database.path.as_os_str() == stockhub_db::pool::IN_MEMORY_PATH {
            DbConfig::in_memory()
        } else {
            DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
        };
        config.stock_gate(self.stock.gate)
    }

    /// Applies overrides from a variable lookup (the process environment in
    /// [`load`](Self::load)).
    ///
    /// Values that fail to parse are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("STOCKHUB_BIND_ADDR") {
            debug!(bind_addr = %addr, "Overriding bind address from environment");
            self.server.bind_addr = addr;
        }

        // Platform-style PORT first, so the namespaced variable wins
        for key in ["PORT", "STOCKHUB_PORT"] {
            if let Some(port) = lookup(key) {
                match port.trim().parse::<u16>() {
                    Ok(p) => {
                        debug!(port = p, variable = key, "Overriding port from environment");
                        self.server.port = p;
                    }
                    Err(_) => warn!(variable = key, value = %port, "Ignoring invalid port"),
                }
            }
        }

        if let Some(path) = lookup("STOCKHUB_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(gate) = lookup("STOCKHUB_STOCK_GATE") {
            match gate.parse::<StockGate>() {
                Ok(parsed) => {
                    debug!(gate = %parsed, "Overriding stock gate from environment");
                    self.stock.gate = parsed;
                }
                Err(e) => warn!(error = %e, "Ignoring invalid stock gate"),
            }
        }

        if let Some(capacity) = lookup("STOCKHUB_BROADCAST_CAPACITY") {
            match capacity.trim().parse::<usize>() {
                Ok(c) => self.server.broadcast_capacity = c,
                Err(_) => warn!(value = %capacity, "Ignoring invalid broadcast capacity"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stockhub", "stockhub")
            .map(|dirs| dirs.config_dir().join("stockhub.toml"))
    }
}
