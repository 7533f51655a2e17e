//! # stockconnect-core
//!
//! The rules of a StockConnect shop with no I/O attached: records, money in
//! minor units, the loyalty formula, order-status transitions, runtime
//! policies and input validation. `stockconnect-db` applies these rules
//! inside transactions; `apps/api` applies the validators at the boundary.
//!
//! ```text
//!   apps/api ──► stockconnect-notify ──► stockconnect-db ──► stockconnect-core
//!      └──────────────────────────────────────┴────────────────────┘
//! ```
//!
//! - [`types`]: Business, Product, Customer, Order, StockMovement, settings
//! - [`money`]: [`Money`]
//! - [`loyalty`]: points earned per order
//! - [`policy`]: stock floor, total verification, cancellation mode
//! - [`validation`]: field validators and phone normalization
//! - [`error`]: [`CoreError`], [`ValidationError`]
//!
//! ```rust
//! use stockconnect_core::loyalty::{compute_earned_points, LoyaltySettings};
//! use stockconnect_core::money::Money;
//!
//! let settings = LoyaltySettings::new(2, Money::from_cents(5_000));
//! assert_eq!(compute_earned_points(Money::from_cents(25_000), Some(&settings)), 10);
//! ```

pub mod error;
pub mod loyalty;
pub mod money;
pub mod policy;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use loyalty::{compute_earned_points, LoyaltySettings};
pub use money::Money;
pub use policy::{CancellationMode, OrderPolicy, StockPolicy};
pub use types::*;

/// Maximum number of lines in a single order.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum quantity of a single order line.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Default reorder threshold for new products.
pub const DEFAULT_REORDER_THRESHOLD: i64 = 5;

/// Business name used in supplier messages when the business has none.
pub const DEFAULT_BUSINESS_NAME: &str = "StockConnect Store";
