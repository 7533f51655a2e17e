//! # Domain Types
//!
//! Records persisted by the ledger store and the enums that describe them.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │                      ┌──────────────┐                                   │
//! │                      │   Business   │  tenant                           │
//! │                      └──────┬───────┘                                   │
//! │          ┌──────────────────┼──────────────────┬─────────────────┐      │
//! │          ▼                  ▼                  ▼                 ▼      │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐  ┌───────────┐ │
//! │  │   Product    │   │   Customer   │   │    Order     │  │ Settings  │ │
//! │  │  quantity    │   │  loyalty_pts │   │  status      │  │ loyalty   │ │
//! │  │  threshold   │   └──────────────┘   │  total_cents │  │ alerts    │ │
//! │  └──────┬───────┘                      └──────┬───────┘  └───────────┘ │
//! │         │                                     │                         │
//! │         ▼                                     ▼                         │
//! │  ┌──────────────┐                      ┌──────────────┐                 │
//! │  │StockMovement │  append-only         │  OrderItem   │  price snapshot │
//! │  └──────────────┘                      └──────────────┘                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Identifiers are SQLite integer row ids. Money columns carry a `_cents`
//! suffix and hold minor units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::loyalty::LoyaltySettings;
use crate::money::Money;

// =============================================================================
// Business
// =============================================================================

/// A tenant. Every product, customer and order belongs to exactly one.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Business {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A stocked product.
///
/// `quantity` changes only through the stock engine, which pairs every
/// change with a [`StockMovement`]. `initial_quantity` is the seed level at
/// creation, so `quantity == initial_quantity + Σ movements` always holds.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,
    pub business_id: i64,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,

    /// Selling price in minor units.
    pub price_cents: i64,

    /// Unit cost in minor units; snapshotted onto order items.
    pub cost_cents: i64,

    /// On-hand quantity. Negative when oversold under the permissive policy.
    pub quantity: i64,

    /// Quantity the product was created with.
    pub initial_quantity: i64,

    /// Low-stock alerts fire when `quantity <= reorder_threshold`.
    pub reorder_threshold: i64,

    pub supplier: Option<String>,
    pub supplier_phone: Option<String>,

    /// Barcode, unique per business.
    pub barcode: Option<String>,

    pub image_url: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Whether the product is at or below its reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_threshold
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer of one business.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: i64,
    pub business_id: i64,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    /// Non-negative balance; raised only by committed orders.
    pub loyalty_points: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle of an order.
///
/// ## Transitions
/// ```text
///   pending ──► confirmed ──► delivered
///      │            │
///      └─────┬──────┘
///            ▼
///        cancelled
/// ```
/// `delivered` and `cancelled` are terminal. Orders created at checkout
/// start as `confirmed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Whether `self → next` is a legal move. Staying put is not a move.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (*self, next),
            (Pending, Confirmed) | (Confirmed, Delivered) | (Pending, Cancelled) | (Confirmed, Cancelled)
        )
    }

    /// States from which `target` can be reached in one step.
    pub fn predecessors(target: OrderStatus) -> Vec<OrderStatus> {
        OrderStatus::ALL
            .into_iter()
            .filter(|from| from.can_transition_to(target))
            .collect()
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Payment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Transfer,
    Pos,
}

// =============================================================================
// Order
// =============================================================================

/// An order header.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: i64,
    pub business_id: i64,
    /// `None` for walk-in sales.
    pub customer_id: Option<i64>,
    /// Caller-supplied total in minor units.
    pub total_cents: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    /// Points credited to the customer when the order was created.
    pub loyalty_points_awarded: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line of an order. Prices are frozen at sale time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    /// Product name at read time, joined from `products`.
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub unit_cost_cents: i64,
}

impl OrderItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

/// An order together with its lines.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

// =============================================================================
// Stock Movement
// =============================================================================

/// Why a stock level changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum StockReason {
    Sale,
    Adjustment,
    Restock,
    Return,
    Damage,
    Loss,
    Cancellation,
}

impl StockReason {
    pub const ALL: [StockReason; 7] = [
        StockReason::Sale,
        StockReason::Adjustment,
        StockReason::Restock,
        StockReason::Return,
        StockReason::Damage,
        StockReason::Loss,
        StockReason::Cancellation,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            StockReason::Sale => "sale",
            StockReason::Adjustment => "adjustment",
            StockReason::Restock => "restock",
            StockReason::Return => "return",
            StockReason::Damage => "damage",
            StockReason::Loss => "loss",
            StockReason::Cancellation => "cancellation",
        }
    }
}

impl Default for StockReason {
    fn default() -> Self {
        StockReason::Adjustment
    }
}

impl fmt::Display for StockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockReason {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StockReason::ALL
            .into_iter()
            .find(|reason| reason.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "reason".to_string(),
                allowed: StockReason::ALL.iter().map(|r| r.as_str().to_string()).collect(),
            })
    }
}

/// Immutable audit entry for one quantity change.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    /// Set for `sale` and `cancellation` movements.
    pub order_id: Option<i64>,
    /// Signed quantity delta.
    pub change_amount: i64,
    pub reason: StockReason,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Product quantity after a stock change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockLevel {
    pub product_id: i64,
    pub quantity: i64,
    pub reorder_threshold: i64,
}

impl StockLevel {
    #[inline]
    pub fn is_low(&self) -> bool {
        self.quantity <= self.reorder_threshold
    }
}

/// Reconciliation of a product's quantity against its movement ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAudit {
    pub product_id: i64,
    pub initial_quantity: i64,
    pub movements_total: i64,
    pub quantity: i64,
}

impl StockAudit {
    /// `quantity == initial_quantity + Σ movements`
    pub fn is_consistent(&self) -> bool {
        self.initial_quantity + self.movements_total == self.quantity
    }
}

// =============================================================================
// Business Settings
// =============================================================================

/// Per-business configuration. One row per business, created lazily.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BusinessSettings {
    pub business_id: i64,
    pub currency: String,
    pub loyalty_points_per_unit: i64,
    /// Spend (minor units) that earns `loyalty_points_per_unit` points.
    pub currency_unit_for_points_cents: i64,
    /// Value (minor units) of one redeemed point.
    pub point_redemption_value_cents: i64,
    pub low_stock_notifications: bool,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_rate_bps: i64,
    pub receipt_footer: Option<String>,
    pub default_sender_id: Option<String>,
    pub auto_receipt_sms: bool,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl BusinessSettings {
    /// Loyalty parameters for the accrual formula.
    pub fn loyalty(&self) -> LoyaltySettings {
        LoyaltySettings {
            points_per_unit: self.loyalty_points_per_unit,
            unit_amount: Money::from_cents(self.currency_unit_for_points_cents),
            point_value: Money::from_cents(self.point_redemption_value_cents),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
