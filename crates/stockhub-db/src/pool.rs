//! # Database Gateway
//!
//! Connection creation, configuration and raw statement execution for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Gateway                                   │
//! │                                                                         │
//! │  Hub startup                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← Configure connection settings                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Connect + run migrations (once)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐                                 │  max_connections = 1      │
//! │  │  │Conn1│  one shared session             │  (default)                │
//! │  │  └─────┘                                 │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       │ Requests from every client queue on the same session           │
//! │       ▼                                                                 │
//! │  products() / inventory() / reconciler() / execute()                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! File databases run with WAL journaling, `synchronous = NORMAL` and
//! foreign keys enabled. Foreign keys are what make deleting a referenced
//! product fail.

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use stockhub_core::StockGate;
use tracing::{debug, error, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::inventory::InventoryRepository;
use crate::repository::product::ProductRepository;
use crate::repository::reconcile::Reconciler;

/// Path value that selects a private in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// How long a connection waits for the write lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust
/// use stockhub_core::StockGate;
/// use stockhub_db::DbConfig;
///
/// let config = DbConfig::new("./stockhub.db")
///     .max_connections(1)
///     .stock_gate(StockGate::Relaxed);
/// assert_eq!(config.max_connections, 1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file, or `:memory:`.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 1 (one shared session)
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection. `None` keeps it forever.
    /// Default: None
    pub idle_timeout: Option<Duration>,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,

    /// Policy applied by stock movements.
    /// Default: strict
    pub stock_gate: StockGate,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// ## Arguments
    /// * `path` - Path to the SQLite database file. Will be created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: None,
            run_migrations: true,
            stock_gate: StockGate::default(),
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Sets the stock movement policy.
    pub fn stock_gate(mut self, gate: StockGate) -> Self {
        self.stock_gate = gate;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None, // Closing the connection would drop the data
            run_migrations: true,
            stock_gate: StockGate::default(),
        }
    }

    /// True when this config selects an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_PATH
    }
}

// =============================================================================
// Statement Parameters
// =============================================================================

/// A positional parameter for [`Database::execute`].
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cheap to clone: every clone shares the same pool. The hub builds one at
/// startup, hands clones to the router, and closes it on shutdown.
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    /// Policy handed to inventory repositories.
    stock_gate: StockGate,
}

impl Database {
    /// Opens the database and prepares the schema.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite (WAL, NORMAL synchronous, foreign keys)
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use database handle
    /// * `Err(DbError)` - Connection or migration failed
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            stock_gate = %config.stock_gate,
            "Initializing database connection"
        );

        let base_options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                // WAL mode: readers don't block writers, writers don't block readers
                .journal_mode(SqliteJournalMode::Wal)
                // NORMAL synchronous: safe from corruption, may lose last commit on crash
                .synchronous(SqliteSynchronous::Normal)
                .create_if_missing(true)
        };

        // SQLite has them disabled by default for backwards compatibility.
        // Writers queued behind an IMMEDIATE transaction wait this long.
        let connect_options = base_options
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            stock_gate: config.stock_gate,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    ///
    /// Called automatically by `new()` if `run_migrations` is true.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the configured stock movement policy.
    pub fn stock_gate(&self) -> StockGate {
        self.stock_gate
    }

    /// Executes one parameterized statement and returns its rows.
    ///
    /// Statements that return nothing (`UPDATE`, `DELETE`, DDL) yield an
    /// empty vector. Failures are not retried.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let rows = db
    ///     .execute("SELECT name FROM product WHERE id = ?1", &[SqlValue::from(1_i64)])
    ///     .await?;
    /// ```
    pub async fn execute(&self, statement: &str, params: &[SqlValue]) -> DbResult<Vec<SqliteRow>> {
        let mut query = sqlx::query(statement);
        for param in params {
            query = match param {
                SqlValue::Null => query.bind(None::<i64>),
                SqlValue::Integer(value) => query.bind(*value),
                SqlValue::Real(value) => query.bind(*value),
                SqlValue::Text(value) => query.bind(value.clone()),
            };
        }

        match query.fetch_all(&self.pool).await {
            Ok(rows) => {
                debug!(statement = %statement, rows = rows.len(), "Statement executed");
                Ok(rows)
            }
            Err(e) => {
                error!(statement = %statement, error = %e, "Statement failed");
                Err(e.into())
            }
        }
    }

    /// Returns the product repository.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    /// Returns the inventory repository, carrying the configured stock gate.
    pub fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.pool.clone(), self.stock_gate)
    }

    /// Returns the snapshot reconciler.
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.pool.clone())
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        self.execute("SELECT 1", &[]).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .stock_gate(StockGate::Relaxed);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.stock_gate, StockGate::Relaxed);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_execute_with_parameters() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let inserted = db
            .execute(
                "INSERT INTO product (name, price_cents, quantity, created_at) \
                 VALUES (?1, ?2, ?3, ?4) RETURNING id",
                &[
                    SqlValue::from("Widget"),
                    SqlValue::from(1000_i64),
                    SqlValue::from(100_i64),
                    SqlValue::from("2024-01-01T00:00:00Z"),
                ],
            )
            .await
            .unwrap();
        let id: i64 = inserted[0].get("id");

        let rows = db
            .execute("SELECT name, quantity FROM product WHERE id = ?1", &[id.into()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get::<String, _>("name"), "Widget");
        assert_eq!(rows[0].get::<i64, _>("quantity"), 100);

        let updated = db
            .execute("UPDATE product SET quantity = 5 WHERE id = ?1", &[id.into()])
            .await
            .unwrap();
        assert!(updated.is_empty());
    }

    #[tokio::test]
    async fn test_execute_surfaces_storage_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let result = db.execute("SELECT * FROM no_such_table", &[]).await;
        assert!(matches!(
            result.map_err(|e| e.kind()),
            Err(crate::error::DbErrorKind::Storage)
        ));
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.run_migrations().await.unwrap();
        assert!(db.health_check().await);
    }
}
