//! # Order Service
//!
//! The boundary in front of the order transaction. Everything that can be
//! refused without touching stock is refused here; the transaction itself
//! trusts its input.
//!
//! ## Checkout Flow
//! ```text
//! POST /api/orders
//!      │
//!      ▼
//! validate ─────────── lines 1..=100, qty 1..=999, prices/total > 0,
//!      │               ≤ 2 decimals, optional total check          ──► 400
//!      ▼
//! ownership ────────── every product and the customer belong to
//!      │               the calling business                        ──► 404
//!      ▼
//! orders().create_order (one transaction)
//!      │    ├── InsufficientStock (floor policy)                   ──► 409
//!      │    └── anything else: logged, rolled back                 ──► 500
//!      ▼
//! commit ──► queue: CheckLowStock × lines, Emit(sale_completed)
//! ```

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use stockconnect_core::validation::{
    validate_order_lines, validate_positive_amount, validate_quantity,
};
use stockconnect_core::{
    CancellationMode, CoreError, Money, OrderPolicy, OrderStatus, PaymentMethod, ValidationError,
};
use stockconnect_db::{CancelledOrder, CreatedOrder, Database, DbError, NewOrder, NewOrderLine, StatusChange};
use stockconnect_notify::{RealtimeEvent, SideEffectQueue};

use crate::error::{ApiError, ApiResult};

const CREATE_FAILED: &str = "Failed to create order";

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: Option<i64>,
    pub items: Vec<OrderLineRequest>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: i64,
    pub quantity: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
}

/// Converts a decimal amount from a request into minor units.
pub fn to_money(field: &str, amount: Decimal) -> Result<Money, ValidationError> {
    Money::from_decimal(amount).ok_or_else(|| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must have at most two decimal places".to_string(),
    })
}

fn too_large(field: &str) -> ValidationError {
    ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "amount too large".to_string(),
    }
}

// =============================================================================
// Service
// =============================================================================

pub struct OrderService {
    db: Database,
    queue: SideEffectQueue,
    policy: OrderPolicy,
}

impl OrderService {
    pub fn new(db: Database, queue: SideEffectQueue, policy: OrderPolicy) -> Self {
        OrderService { db, queue, policy }
    }

    /// Validates, checks ownership, runs the order transaction and queues
    /// the post-commit work.
    ///
    /// ## Returns
    /// * `Ok(CreatedOrder)` - committed; side effects are queued
    /// * `Err(Validation)` / `Err(NotFound)` - refused before the transaction
    /// * `Err(InsufficientStock)` - the floor policy refused a line
    /// * `Err(Internal)` - the transaction failed and was rolled back
    pub async fn create_order(&self, business_id: i64, request: &CreateOrderRequest) -> ApiResult<CreatedOrder> {
        let order = self.build_order(business_id, request)?;
        self.check_ownership(&order).await?;

        let created = match self.db.orders().create_order(&order, self.policy.stock).await {
            Ok(created) => created,
            Err(DbError::Rule(rule @ CoreError::InsufficientStock { .. })) => {
                warn!(business_id, error = %rule, "Order refused by stock floor");
                return Err(rule.into());
            }
            Err(e) => {
                error!(business_id, error = %e, "Order transaction rolled back");
                return Err(ApiError::Internal(CREATE_FAILED.to_string()));
            }
        };

        for level in &created.stock_levels {
            self.queue.check_low_stock(level.product_id, business_id);
        }
        self.queue
            .emit(RealtimeEvent::sale_completed(business_id, created.order_id));

        info!(
            order_id = created.order_id,
            business_id,
            lines = created.stock_levels.len(),
            loyalty_points = created.loyalty_points_awarded,
            "Order created"
        );
        Ok(created)
    }

    /// Moves an order along the status machine.
    ///
    /// `cancelled` follows the configured cancellation mode. Re-applying the
    /// current status succeeds without emitting anything.
    pub async fn update_status(&self, business_id: i64, order_id: i64, next: OrderStatus) -> ApiResult<StatusChange> {
        let change = if next == OrderStatus::Cancelled {
            match self.policy.cancellation_mode {
                CancellationMode::StatusOnly => {
                    self.db.orders().mark_cancelled_only(business_id, order_id).await?
                }
                CancellationMode::ReverseEffects => {
                    match self.db.orders().cancel_with_reversal(business_id, order_id).await {
                        Ok(_) => StatusChange::Updated,
                        Err(DbError::Rule(CoreError::InvalidStatusTransition {
                            from: OrderStatus::Cancelled,
                            ..
                        })) => StatusChange::Unchanged,
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        } else {
            self.db.orders().update_status(business_id, order_id, next).await?
        };

        match change {
            StatusChange::Updated => {
                self.queue
                    .emit(RealtimeEvent::order_status_updated(business_id, order_id, next));
                debug!(order_id, business_id, status = %next, "Status change queued for subscribers");
            }
            StatusChange::Unchanged => {
                debug!(order_id, business_id, status = %next, "Order status unchanged");
            }
        }

        Ok(change)
    }

    /// Cancels an order and reverses its stock and loyalty effects.
    pub async fn cancel_with_reversal(&self, business_id: i64, order_id: i64) -> ApiResult<CancelledOrder> {
        let cancelled = self.db.orders().cancel_with_reversal(business_id, order_id).await?;

        self.queue.emit(RealtimeEvent::order_status_updated(
            business_id,
            order_id,
            OrderStatus::Cancelled,
        ));

        Ok(cancelled)
    }

    // =========================================================================
    // Boundary checks
    // =========================================================================

    fn build_order(&self, business_id: i64, request: &CreateOrderRequest) -> ApiResult<NewOrder> {
        validate_order_lines(request.items.len())?;

        let total = to_money("totalAmount", request.total_amount)?;
        validate_positive_amount("totalAmount", total)?;

        let mut lines = Vec::with_capacity(request.items.len());
        let mut line_totals = Vec::with_capacity(request.items.len());
        for item in &request.items {
            validate_quantity(item.quantity)?;
            let unit_price = to_money("unitPrice", item.unit_price)?;
            validate_positive_amount("unitPrice", unit_price)?;
            line_totals.push(
                unit_price
                    .checked_multiply_quantity(item.quantity)
                    .ok_or_else(|| too_large("unitPrice"))?,
            );

            lines.push(NewOrderLine {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price_cents: unit_price.cents(),
            });
        }
        let computed = Money::checked_sum(line_totals).ok_or_else(|| too_large("items"))?;

        if self.policy.verify_order_total && computed != total {
            return Err(CoreError::TotalMismatch {
                declared: total.cents(),
                computed: computed.cents(),
            }
            .into());
        }

        Ok(NewOrder {
            business_id,
            customer_id: request.customer_id,
            total_cents: total.cents(),
            payment_method: request.payment_method.unwrap_or_default(),
            lines,
        })
    }

    async fn check_ownership(&self, order: &NewOrder) -> ApiResult<()> {
        let mut ids: Vec<i64> = order.lines.iter().map(|line| line.product_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let owned = self.db.products().owned_ids(order.business_id, &ids).await?;
        if let Some(missing) = ids.iter().find(|id| !owned.contains(id)) {
            return Err(ApiError::not_found(format!("Product {} not found", missing)));
        }

        if let Some(customer_id) = order.customer_id {
            if self.db.customers().get(order.business_id, customer_id).await?.is_none() {
                return Err(ApiError::not_found(format!("Customer {} not found", customer_id)));
            }
        }

        Ok(())
    }
}
