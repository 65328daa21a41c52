//! # Stockhub Server
//!
//! WebSocket hub for the shared product catalog and stock ledger.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockhub Server                                  │
//! │                                                                         │
//! │  Terminals ───► WebSocket (8000/ws) ───► Router ───► SQLite            │
//! │      ▲                                      │                           │
//! │      └──────────── broadcast ◄──────────────┘                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//! 1. Tracing (`RUST_LOG` overrides the default filter)
//! 2. Config: defaults → `stockhub.toml` → environment
//! 3. Database opened once, migrations applied
//! 4. Router and hub built around the shared context
//! 5. Ctrl+C / SIGTERM: hub closes connections, then the database closes

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use stockhub_db::Database;
use stockhub_sync::{HubServer, ModeFlag, Router, ServerConfig};

const DEFAULT_LOG_FILTER: &str = "info,stockhub=debug,sqlx=warn";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("Starting Stockhub server...");

    // Load configuration
    let config = ServerConfig::load(None)?;
    info!(
        addr = %config.server.bind_address(),
        db_path = %config.database.path.display(),
        stock_gate = %config.stock.gate,
        "Configuration loaded"
    );

    // Open the store once for the process lifetime
    let db = Database::new(config.to_db_config()).await?;
    if !db.health_check().await {
        error!("Database health check failed");
        db.close().await;
        return Err("database health check failed".into());
    }

    // Context shared by every connection
    let router = Router::new(db.clone(), ModeFlag::default());

    let hub = HubServer::new(config.server.clone(), router).start().await?;
    info!(addr = %hub.local_addr(), "Accepting connections on /ws");

    shutdown_signal().await;

    hub.shutdown().await?;
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
