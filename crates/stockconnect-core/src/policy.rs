//! # Runtime Policies
//!
//! Switches that change how orders and stock behave, chosen per deployment.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  StockPolicy        allow_negative_stock   true  → sell past zero       │
//! │                                            false → InsufficientStock    │
//! │                                                                         │
//! │  OrderPolicy        verify_order_total     false → trust caller total   │
//! │                                            true  → total == Σ lines     │
//! │                     cancellation_mode      status_only | reverse_effects│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// How the stock engine treats decrements past zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPolicy {
    pub allow_negative_stock: bool,
}

impl StockPolicy {
    /// Quantities may go negative (oversell is recorded, never refused).
    pub const fn permissive() -> Self {
        StockPolicy {
            allow_negative_stock: true,
        }
    }

    /// Decrements below zero are refused.
    pub const fn floor_at_zero() -> Self {
        StockPolicy {
            allow_negative_stock: false,
        }
    }

    /// Returns whether moving `current` by `delta` is allowed.
    pub fn permits(&self, current: i64, delta: i64) -> bool {
        self.allow_negative_stock || delta >= 0 || current + delta >= 0
    }
}

impl Default for StockPolicy {
    fn default() -> Self {
        StockPolicy::permissive()
    }
}

/// What setting an order's status to `cancelled` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationMode {
    /// Only the status column changes.
    #[default]
    StatusOnly,
    /// Stock is restored and awarded loyalty points are taken back.
    ReverseEffects,
}

impl fmt::Display for CancellationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancellationMode::StatusOnly => write!(f, "status_only"),
            CancellationMode::ReverseEffects => write!(f, "reverse_effects"),
        }
    }
}

impl FromStr for CancellationMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "status_only" => Ok(CancellationMode::StatusOnly),
            "reverse_effects" => Ok(CancellationMode::ReverseEffects),
            _ => Err(ValidationError::NotAllowed {
                field: "cancellation_mode".to_string(),
                allowed: vec!["status_only".to_string(), "reverse_effects".to_string()],
            }),
        }
    }
}

/// Order handling policy for the API layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderPolicy {
    pub stock: StockPolicy,
    pub verify_order_total: bool,
    pub cancellation_mode: CancellationMode,
}
