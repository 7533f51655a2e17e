//! # Errors
//!
//! Two layers live here. [`ValidationError`] is raised at the boundary
//! before anything is written. [`CoreError`] is a business refusal that can
//! also come from inside a transaction; the store wraps it as
//! `DbError::Rule` and the API maps it to 409 or 400.
//!
//! ```text
//! ValidationError ──► CoreError::Validation ──► DbError::Rule ──► ApiError
//! ```

use thiserror::Error;

use crate::types::OrderStatus;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A decrement would take stock below zero under the floor policy
    /// (`allow_negative_stock = false`). The surrounding transaction is
    /// rolled back, so a multi-line order leaves nothing behind.
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i64,
        available: i64,
        requested: i64,
    },

    /// Not an edge of `pending → confirmed → delivered` or `→ cancelled`.
    /// Delivered and cancelled orders never move again.
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Declared total differs from Σ unit price × quantity, in minor units.
    /// Only raised when `verify_order_total` is on.
    #[error("Order total {declared} does not match line total {computed}")]
    TotalMismatch { declared: i64, computed: i64 },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation
// =============================================================================

/// Malformed or out-of-range input. `field` uses the request's field name.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Bad phone, email or barcode shape, or more than two decimals.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: 7,
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product 7: available 3, requested 5"
        );

        let err = CoreError::InvalidStatusTransition {
            order_id: 12,
            from: OrderStatus::Delivered,
            to: OrderStatus::Pending,
        };
        assert_eq!(err.to_string(), "Order 12 cannot move from delivered to pending");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "phone".to_string(),
        };
        assert_eq!(err.to_string(), "phone is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
