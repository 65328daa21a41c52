//! # Repository Module
//!
//! Database repository implementations for the catalog and stock ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Router                                                                │
//! │       │                                                                 │
//! │       │  db.inventory().decrement_stock(1, 20, "Widget")               │
//! │       ▼                                                                 │
//! │  ProductRepository        InventoryRepository       Reconciler         │
//! │  ├── list                 ├── list                  └── reconcile      │
//! │  ├── get_by_id            ├── get_by_id                                │
//! │  ├── create               ├── create / update                          │
//! │  ├── update               ├── delete                                   │
//! │  └── delete               ├── increment_stock                          │
//! │                           └── decrement_stock                          │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database (product, inventory)                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD
//! - [`InventoryRepository`](inventory::InventoryRepository) - Movement rows and stock mutations
//! - [`Reconciler`](reconcile::Reconciler) - Offline snapshot merge

pub mod inventory;
pub mod product;
pub mod reconcile;
