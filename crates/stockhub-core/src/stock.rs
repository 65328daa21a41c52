//! # Stock Movement Rule
//!
//! The pure decision behind `increment_stock` / `decrement_stock`: given the
//! on-hand count and a requested movement, either produce the new on-hand
//! count or decline the movement.
//!
//! ## Gate Policies
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         StockGate                                       │
//! │                                                                         │
//! │  Strict (default)               Relaxed                                 │
//! │  ─────────────────────────      ─────────────────────────               │
//! │  In:  q <  on_hand → +q         In:  always → +q                        │
//! │  Out: q <  on_hand → -q         Out: q <= on_hand → -q                  │
//! │                                                                         │
//! │  Otherwise: declined (no-op, empty result, no error)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `Strict` is what deployed terminals have always observed: both directions
//! compare the movement against the current count, so stock can never be
//! emptied to exactly zero and large deliveries are refused. `Relaxed` is the
//! capacity-free reading of the same operations. Which one a hub runs is a
//! configuration choice (`[stock] gate`).
//!
//! ## Example
//! ```rust
//! use stockhub_core::stock::{apply_movement, MovementDirection, StockGate};
//!
//! // 100 on hand, take 20 out
//! let next = apply_movement(StockGate::Strict, MovementDirection::Out, 100, 20).unwrap();
//! assert_eq!(next, Some(80));
//!
//! // 100 on hand, bring 150 in: declined under the strict gate
//! let next = apply_movement(StockGate::Strict, MovementDirection::In, 100, 150).unwrap();
//! assert_eq!(next, None);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation::validate_quantity;

// =============================================================================
// Stock Gate
// =============================================================================

/// Policy deciding whether a movement may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockGate {
    /// Both directions require `quantity < on_hand`.
    #[default]
    Strict,
    /// Increments always proceed; decrements require `quantity <= on_hand`.
    Relaxed,
}

impl StockGate {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockGate::Strict => "strict",
            StockGate::Relaxed => "relaxed",
        }
    }

    /// Whether a movement of `quantity` may proceed against `on_hand`.
    pub fn permits(&self, direction: MovementDirection, on_hand: i64, quantity: i64) -> bool {
        match (self, direction) {
            (StockGate::Strict, _) => quantity < on_hand,
            (StockGate::Relaxed, MovementDirection::In) => true,
            (StockGate::Relaxed, MovementDirection::Out) => quantity <= on_hand,
        }
    }
}

impl fmt::Display for StockGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockGate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(StockGate::Strict),
            "relaxed" => Ok(StockGate::Relaxed),
            _ => Err(ValidationError::NotAllowed {
                field: "stock gate".to_string(),
                allowed: vec!["strict".to_string(), "relaxed".to_string()],
            }),
        }
    }
}

// =============================================================================
// Movement Direction
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementDirection {
    /// Goods received (`INVENTORY_IN`).
    In,
    /// Goods issued (`INVENTORY_OUT`).
    Out,
}

impl MovementDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::In => "in",
            MovementDirection::Out => "out",
        }
    }
}

// =============================================================================
// Rule
// =============================================================================

/// Applies the stock rule.
///
/// ## Returns
/// - `Ok(Some(new_on_hand))` when the movement proceeds
/// - `Ok(None)` when the gate declines it
/// - `Err` for a negative movement or an increment past `i64::MAX`
pub fn apply_movement(
    gate: StockGate,
    direction: MovementDirection,
    on_hand: i64,
    quantity: i64,
) -> CoreResult<Option<i64>> {
    validate_quantity(quantity)?;

    if !gate.permits(direction, on_hand, quantity) {
        return Ok(None);
    }

    let next = match direction {
        MovementDirection::In => on_hand.checked_add(quantity),
        MovementDirection::Out => on_hand.checked_sub(quantity),
    };

    match next {
        Some(value) if value >= 0 => Ok(Some(value)),
        _ => Err(CoreError::StockOverflow {
            on_hand,
            requested: quantity,
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_gate_matches_deployed_behaviour() {
        let gate = StockGate::Strict;
        assert_eq!(apply_movement(gate, MovementDirection::Out, 100, 20).unwrap(), Some(80));
        assert_eq!(apply_movement(gate, MovementDirection::In, 100, 20).unwrap(), Some(120));

        // q >= on_hand is declined in both directions
        assert_eq!(apply_movement(gate, MovementDirection::In, 100, 150).unwrap(), None);
        assert_eq!(apply_movement(gate, MovementDirection::In, 100, 100).unwrap(), None);
        assert_eq!(apply_movement(gate, MovementDirection::Out, 100, 100).unwrap(), None);
        assert_eq!(apply_movement(gate, MovementDirection::In, 0, 0).unwrap(), None);
    }

    #[test]
    fn test_relaxed_gate() {
        let gate = StockGate::Relaxed;
        assert_eq!(apply_movement(gate, MovementDirection::In, 100, 150).unwrap(), Some(250));
        assert_eq!(apply_movement(gate, MovementDirection::Out, 100, 100).unwrap(), Some(0));
        assert_eq!(apply_movement(gate, MovementDirection::Out, 100, 101).unwrap(), None);
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let result = apply_movement(StockGate::Relaxed, MovementDirection::Out, 100, -5);
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_increment_overflow() {
        let result = apply_movement(StockGate::Relaxed, MovementDirection::In, i64::MAX - 1, 5);
        assert!(matches!(result, Err(CoreError::StockOverflow { .. })));
    }

    #[test]
    fn test_gate_from_str() {
        assert_eq!("strict".parse::<StockGate>().unwrap(), StockGate::Strict);
        assert_eq!(" Relaxed ".parse::<StockGate>().unwrap(), StockGate::Relaxed);
        assert!("lenient".parse::<StockGate>().is_err());
        assert_eq!(StockGate::default(), StockGate::Strict);
    }
}
