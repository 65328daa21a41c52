//! # Error Types
//!
//! Domain-specific error types for stockhub-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockhub-core errors (this file)                                      │
//! │  ├── CoreError        - Stock rule / domain failures                   │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockhub-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  stockhub-sync errors (separate crate)                                 │
//! │  └── SyncError        - Config / transport / protocol failures         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → FAILURE envelope        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, quantities)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a wire error code

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
///
/// Raised by the pure stock rule and by input conversion. The database
/// layer folds these into `DbError` so every failure reaches the client as
/// a single coded response.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// Inventory row cannot be found.
    #[error("Inventory item not found: {0}")]
    InventoryItemNotFound(i64),

    /// Applying the movement would leave the on-hand count unrepresentable.
    ///
    /// ## When This Occurs
    /// ```text
    /// on_hand = i64::MAX - 1
    ///      │
    ///      ▼
    /// increment by 5
    ///      │
    ///      ▼
    /// StockOverflow { on_hand, requested: 5 }
    /// ```
    #[error("Stock overflow: on hand {on_hand}, requested {requested}")]
    StockOverflow { on_hand: i64, requested: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when client input doesn't meet requirements.
/// Used for early validation before anything touches the store.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., non-numeric id, bad decimal).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::StockOverflow {
            on_hand: 9,
            requested: 5,
        };
        assert_eq!(err.to_string(), "Stock overflow: on hand 9, requested 5");
        assert_eq!(CoreError::ProductNotFound(7).to_string(), "Product not found: 7");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::Negative {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
