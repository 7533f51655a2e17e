//! # Money
//!
//! Amounts are stored and computed in integer minor units (kobo). Loyalty
//! accrual floors `total / unit × points`; with floats a 300.00 total and a
//! 100.00 unit can land on 2.9999 and lose a point, with integers it is 3.
//!
//! The dashboard sends decimal major units (`1500.50`). The API converts
//! them once with [`Money::from_decimal`], which refuses a third decimal
//! place rather than rounding it away.
//!
//! ```rust
//! use stockconnect_core::money::Money;
//!
//! let rice = Money::from_cents(1_500_000); // 15000.00
//! let line = rice.multiply_quantity(4);
//! assert_eq!(line.to_string(), "60000.00");
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// An amount in minor units. Signed so reversals can be expressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    pub const fn zero() -> Self {
        Money(0)
    }

    /// Exact conversion from major units.
    ///
    /// `None` for more than two decimal places or a value outside `i64`
    /// minor units.
    ///
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use stockconnect_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(Decimal::new(150050, 2)).map(|m| m.cents()), Some(150050));
    /// assert!(Money::from_decimal(Decimal::new(10005, 3)).is_none());
    /// ```
    pub fn from_decimal(amount: Decimal) -> Option<Self> {
        if amount.normalize().scale() > 2 {
            return None;
        }
        amount
            .checked_mul(Decimal::ONE_HUNDRED)?
            .trunc()
            .to_i64()
            .map(Money)
    }

    /// Major units with two decimal places, for JSON responses.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    pub const fn cents(&self) -> i64 {
        self.0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Line total for `qty` units at this price, clamped to the `i64`
    /// range. Used for amounts read back from the store.
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Line total for `qty` units, `None` when it leaves the `i64` range.
    /// Request amounts go through this.
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    pub const fn checked_add(&self, rhs: Money) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sum of request amounts, `None` on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}
