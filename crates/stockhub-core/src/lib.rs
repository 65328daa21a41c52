//! # stockhub-core: Pure Domain Logic for Stockhub
//!
//! This crate holds the catalog/stock domain as pure types and functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockhub Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Clients (POS terminals, tag writer, admin UI)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ WebSocket (JSON envelopes)             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                stockhub-sync (router + hub)                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockhub-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   stock   │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ StockGate │  │   rules   │  │   │
//! │  │   │ Inventory │  │  decimal  │  │ apply_mvt │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                stockhub-db (Database Layer)                     │   │
//! │  │         SQLite gateway, repositories, reconciliation            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, InventoryItem, write models, wire inputs)
//! - [`money`] - Integer-cent money with decimal wire format
//! - [`stock`] - The stock movement rule and its gate policies
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use stockhub_core::{apply_movement, Money, MovementDirection, StockGate};
//!
//! let price = Money::parse_decimal("10.00").unwrap();
//! assert_eq!(price.cents(), 1000);
//!
//! let on_hand = apply_movement(StockGate::Strict, MovementDirection::Out, 100, 20).unwrap();
//! assert_eq!(on_hand, Some(80));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use stockhub_core::Money` instead of
// `use stockhub_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use stock::{apply_movement, MovementDirection, StockGate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a product name, in characters.
pub const MAX_NAME_LENGTH: usize = 255;
