//! # Validation Module
//!
//! Input validation for catalog rows and stock movements.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Envelope decoding (stockhub-sync)                            │
//! │  ├── JSON shape, id coercion                                           │
//! │  └── Money parsing (number or decimal string)                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Name present and bounded                                          │
//! │  └── Price / quantity not negative                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign key product_id → product.id                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockhub_core::validation::{validate_product_name, validate_quantity};
//!
//! validate_product_name("Widget").unwrap();
//! validate_quantity(20).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::MAX_NAME_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 255 characters (the width the catalog was first designed for)
///
/// ## Example
/// ```rust
/// use stockhub_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Widget").is_ok());
/// assert!(validate_product_name("   ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

/// Validates the denormalized name on a movement row.
///
/// Blank is allowed here (the repository substitutes the product's name),
/// only the length is bounded.
pub fn validate_movement_name(name: &str) -> ValidationResult<()> {
    if name.trim().chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "product_name".to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an on-hand or movement quantity.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (an empty shelf, or a no-op movement)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::Negative {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a product price.
///
/// ## Example
/// ```rust
/// use stockhub_core::money::Money;
/// use stockhub_core::validation::validate_price;
///
/// assert!(validate_price(Money::from_cents(1099)).is_ok());
/// assert!(validate_price(Money::zero()).is_ok());
/// assert!(validate_price(Money::from_cents(-1)).is_err());
/// ```
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates a row identifier supplied by a client.
pub fn validate_id(field: &str, id: i64) -> ValidationResult<()> {
    if id <= 0 {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("{} is not a valid identifier", id),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
