//! # Loyalty Accrual
//!
//! Converts an order total into loyalty points for the buying customer.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  points = floor( (total / unit_amount) × points_per_unit )              │
//! │                                                                         │
//! │  total        = 2500.00   (250000 minor units)                          │
//! │  unit_amount  =   50.00   (  5000 minor units)                          │
//! │  points/unit  =        2                                                │
//! │                                                                         │
//! │  250000 × 2 / 5000 = 100 points                                         │
//! │                                                                         │
//! │  Multiply first, divide last, in i128: no rounding before the floor.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Settings missing, or holding non-positive values, fall back to
//! 1 point per 100.00.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

/// Points awarded per unit when the business has not configured one.
pub const DEFAULT_POINTS_PER_UNIT: i64 = 1;

/// Highest points-per-unit rate a business may configure.
pub const MAX_POINTS_PER_UNIT: i64 = 10_000;

/// Spend per unit when the business has not configured one (100.00).
pub const DEFAULT_UNIT_AMOUNT: Money = Money::from_cents(10_000);

/// Loyalty parameters taken from a business's settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoyaltySettings {
    pub points_per_unit: i64,
    pub unit_amount: Money,
    /// Value of a single point when redeemed.
    pub point_value: Money,
}

impl LoyaltySettings {
    pub fn new(points_per_unit: i64, unit_amount: Money) -> Self {
        LoyaltySettings {
            points_per_unit,
            unit_amount,
            point_value: Money::from_cents(1_000),
        }
    }

    /// Points per unit with the zero/negative fallback applied.
    pub fn effective_points_per_unit(&self) -> i64 {
        if self.points_per_unit > 0 {
            self.points_per_unit
        } else {
            DEFAULT_POINTS_PER_UNIT
        }
    }

    /// Unit amount with the zero/negative fallback applied.
    pub fn effective_unit_amount(&self) -> Money {
        if self.unit_amount.is_positive() {
            self.unit_amount
        } else {
            DEFAULT_UNIT_AMOUNT
        }
    }
}

impl Default for LoyaltySettings {
    fn default() -> Self {
        LoyaltySettings::new(DEFAULT_POINTS_PER_UNIT, DEFAULT_UNIT_AMOUNT)
    }
}

/// Computes the points a purchase of `total` earns.
///
/// Pure and deterministic. Non-positive totals earn nothing.
///
/// ## Example
/// ```rust
/// use stockconnect_core::loyalty::{compute_earned_points, LoyaltySettings};
/// use stockconnect_core::money::Money;
///
/// // 1000.00 at 1 point per 100.00
/// assert_eq!(compute_earned_points(Money::from_major(1000), None), 10);
///
/// // 250.00 at 2 points per 50.00
/// let settings = LoyaltySettings::new(2, Money::from_major(50));
/// assert_eq!(compute_earned_points(Money::from_major(250), Some(&settings)), 10);
/// ```
pub fn compute_earned_points(total: Money, settings: Option<&LoyaltySettings>) -> i64 {
    if !total.is_positive() {
        return 0;
    }

    let (points_per_unit, unit_amount) = match settings {
        Some(s) => (s.effective_points_per_unit(), s.effective_unit_amount()),
        None => (DEFAULT_POINTS_PER_UNIT, DEFAULT_UNIT_AMOUNT),
    };

    let points =
        total.cents() as i128 * points_per_unit as i128 / unit_amount.cents() as i128;

    i64::try_from(points).unwrap_or(i64::MAX)
}

/// Monetary value of a points balance.
pub fn redemption_value(points: i64, settings: &LoyaltySettings) -> Money {
    settings.point_value.multiply_quantity(points.max(0))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rate() {
        let settings = LoyaltySettings::new(1, Money::from_major(100));
        assert_eq!(compute_earned_points(Money::from_major(1000), Some(&settings)), 10);
        assert_eq!(compute_earned_points(Money::from_major(1000), None), 10);
    }

    #[test]
    fn test_custom_rate() {
        let settings = LoyaltySettings::new(2, Money::from_major(50));
        assert_eq!(compute_earned_points(Money::from_major(250), Some(&settings)), 10);
    }

    #[test]
    fn test_zero_total_earns_nothing() {
        let settings = LoyaltySettings::new(5, Money::from_major(1));
        assert_eq!(compute_earned_points(Money::zero(), Some(&settings)), 0);
        assert_eq!(compute_earned_points(Money::from_cents(-500), None), 0);
    }

    #[test]
    fn test_result_is_floored() {
        // 199.99 at 1 per 100.00 → 1.9999 → 1
        assert_eq!(compute_earned_points(Money::from_cents(19_999), None), 1);
        // 99.99 → 0
        assert_eq!(compute_earned_points(Money::from_cents(9_999), None), 0);
    }

    #[test]
    fn test_non_positive_settings_fall_back() {
        let zero_unit = LoyaltySettings::new(3, Money::zero());
        // 300.00 / 100.00 × 3
        assert_eq!(compute_earned_points(Money::from_major(300), Some(&zero_unit)), 9);

        let zero_points = LoyaltySettings::new(0, Money::from_major(10));
        assert_eq!(compute_earned_points(Money::from_major(300), Some(&zero_points)), 30);
    }

    #[test]
    fn test_large_totals_do_not_overflow() {
        let settings = LoyaltySettings::new(1_000, Money::from_cents(1));
        let points = compute_earned_points(Money::from_cents(i64::MAX / 10), Some(&settings));
        assert_eq!(points, i64::MAX);
    }

    #[test]
    fn test_redemption_value() {
        let settings = LoyaltySettings::default();
        assert_eq!(redemption_value(12, &settings).cents(), 12_000);
        assert_eq!(redemption_value(-4, &settings).cents(), 0);
    }
}
