//! # stockhub-db: Database Layer for Stockhub
//!
//! This crate owns every interaction with the store: the gateway handle,
//! the schema, the catalog/ledger repositories and snapshot reconciliation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockhub Data Flow                               │
//! │                                                                         │
//! │  Router (stockhub-sync)                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  stockhub-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ InventoryRepo │    │ 001_init.sql │  │   │
//! │  │   │ execute()     │    │ Reconciler    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │                product ◄──FK── inventory                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Database handle, configuration, raw statement execution
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Product, inventory and reconciliation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockhub_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("stockhub.db")).await?;
//!
//! let products = db.products().list().await?;
//! let moved = db.inventory().decrement_stock(1, 20, "Widget").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbErrorKind, DbResult};
pub use pool::{Database, DbConfig, SqlValue};

// Repository re-exports for convenience
pub use repository::inventory::InventoryRepository;
pub use repository::product::ProductRepository;
pub use repository::reconcile::{ReconcileStats, Reconciler};
