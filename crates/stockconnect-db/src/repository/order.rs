//! # Order Repository
//!
//! Atomic order creation, the status machine, and cancellation.
//!
//! ## Order Creation Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_order(new_order, policy)                                        │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    INSERT orders (status = confirmed, payment = unpaid)                 │
//! │    for each line:                                                       │
//! │      SELECT cost_cents            ── missing product → NotFound         │
//! │      INSERT order_items (price and cost frozen)                         │
//! │      apply_stock_delta(-qty, sale) ── floor refused → InsufficientStock │
//! │    if customer:                                                         │
//! │      load loyalty settings (defaults if none saved)                     │
//! │      UPDATE customers SET loyalty_points += earned                      │
//! │      UPDATE orders SET loyalty_points_awarded = earned                  │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error drops the transaction: no header, no lines, no movements,    │
//! │  no points. Post-commit work is the caller's job.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Changes
//! A status update is one conditional `UPDATE ... WHERE status IN (legal
//! predecessors)`, so two racing updates cannot both pass the check.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::settings::load_loyalty;
use super::stock::{apply_stock_delta, StockChange};
use crate::error::{DbError, DbResult};
use stockconnect_core::{
    compute_earned_points, CoreError, Money, Order, OrderItem, OrderStatus, OrderWithItems,
    PaymentMethod, PaymentStatus, StockLevel, StockPolicy,
};

const ORDER_COLUMNS: &str = "id, business_id, customer_id, total_cents, status, payment_status, \
     payment_method, loyalty_points_awarded, created_at, updated_at";

// =============================================================================
// Inputs and Outcomes
// =============================================================================

/// One requested order line. The caller has verified the product belongs
/// to the order's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderLine {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// A validated checkout request.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub business_id: i64,
    /// `None` for a walk-in sale.
    pub customer_id: Option<i64>,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub lines: Vec<NewOrderLine>,
}

/// What a committed order changed.
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub order_id: i64,
    pub business_id: i64,
    pub loyalty_points_awarded: i64,
    /// Post-sale level of every product touched, in line order.
    pub stock_levels: Vec<StockLevel>,
}

/// Result of a status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// The row moved to the new status.
    Updated,
    /// The order already had the requested status.
    Unchanged,
}

/// What a reversing cancellation restored.
#[derive(Debug, Clone)]
pub struct CancelledOrder {
    pub order_id: i64,
    pub business_id: i64,
    pub restored: Vec<StockLevel>,
    pub customer_id: Option<i64>,
    pub points_reversed: i64,
}

#[derive(Debug, Clone)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for OrderListQuery {
    fn default() -> Self {
        OrderListQuery {
            status: None,
            customer_id: None,
            limit: 50,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderPage {
    pub data: Vec<Order>,
    pub total: i64,
}

/// Order count and revenue for the analytics summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderTotals {
    pub order_count: i64,
    /// Sum of totals over non-cancelled orders.
    pub revenue_cents: i64,
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Creates an order, its lines, its stock movements and its loyalty
    /// credit in one transaction.
    ///
    /// ## Returns
    /// * `Ok(CreatedOrder)` - everything committed
    /// * `Err(DbError::NotFound)` - a product or the customer does not exist
    /// * `Err(DbError::Rule(InsufficientStock))` - the floor policy refused a line
    pub async fn create_order(&self, order: &NewOrder, policy: StockPolicy) -> DbResult<CreatedOrder> {
        debug!(
            business_id = order.business_id,
            lines = order.lines.len(),
            total_cents = order.total_cents,
            "Creating order"
        );

        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;
        let now = Utc::now();

        let order_id = sqlx::query(
            r#"
            INSERT INTO orders (
                business_id, customer_id, total_cents, status, payment_status,
                payment_method, loyalty_points_awarded, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)
            "#,
        )
        .bind(order.business_id)
        .bind(order.customer_id)
        .bind(order.total_cents)
        .bind(OrderStatus::Confirmed)
        .bind(PaymentStatus::Unpaid)
        .bind(order.payment_method)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| missing_customer(e, order.customer_id))?
        .last_insert_rowid();

        let mut stock_levels = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let unit_cost: Option<i64> =
                sqlx::query_scalar("SELECT cost_cents FROM products WHERE id = ?1")
                    .bind(line.product_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            let unit_cost = unit_cost.ok_or_else(|| DbError::not_found("Product", line.product_id))?;

            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, unit_price_cents, unit_cost_cents)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .bind(unit_cost)
            .execute(&mut *tx)
            .await?;

            let level = apply_stock_delta(
                &mut *tx,
                &StockChange::sale(line.product_id, line.quantity, order_id),
                policy,
            )
            .await?;
            stock_levels.push(level);
        }

        let mut points = 0;
        if let Some(customer_id) = order.customer_id {
            let loyalty = load_loyalty(&mut *tx, order.business_id).await?;
            points = compute_earned_points(Money::from_cents(order.total_cents), loyalty.as_ref());

            // Saturating add, capped at i64::MAX
            let credited = sqlx::query(
                r#"
                UPDATE customers
                SET loyalty_points = CASE
                    WHEN loyalty_points > ?3 - ?1 THEN ?3
                    ELSE loyalty_points + ?1
                END
                WHERE id = ?2
                "#,
            )
            .bind(points)
            .bind(customer_id)
            .bind(i64::MAX)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if credited == 0 {
                return Err(DbError::not_found("Customer", customer_id));
            }

            sqlx::query("UPDATE orders SET loyalty_points_awarded = ?1 WHERE id = ?2")
                .bind(points)
                .bind(order_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await.map_err(DbError::transaction)?;

        info!(
            order_id,
            business_id = order.business_id,
            customer_id = ?order.customer_id,
            points_awarded = points,
            "Order committed"
        );

        Ok(CreatedOrder {
            order_id,
            business_id: order.business_id,
            loyalty_points_awarded: points,
            stock_levels,
        })
    }

    /// Gets an order owned by `business_id`, with its lines.
    pub async fn get_with_items(&self, business_id: i64, order_id: i64) -> DbResult<Option<OrderWithItems>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE id = ?1 AND business_id = ?2",
            ORDER_COLUMNS
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(order_id)
            .bind(business_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items = self.items(order.id).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    /// Lines of one order, with product names joined at read time.
    pub async fn items(&self, order_id: i64) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name,
                   oi.quantity, oi.unit_price_cents, oi.unit_cost_cents
            FROM order_items oi
            INNER JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = ?1
            ORDER BY oi.id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists orders newest first.
    pub async fn list(&self, business_id: i64, query: &OrderListQuery) -> DbResult<OrderPage> {
        let filter = "WHERE business_id = ?1 AND (?2 IS NULL OR status = ?2) \
                      AND (?3 IS NULL OR customer_id = ?3)";

        let sql = format!(
            "SELECT {} FROM orders {} ORDER BY created_at DESC, id DESC LIMIT ?4 OFFSET ?5",
            ORDER_COLUMNS, filter
        );
        let data = sqlx::query_as::<_, Order>(&sql)
            .bind(business_id)
            .bind(query.status)
            .bind(query.customer_id)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM orders {}", filter);
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(business_id)
            .bind(query.status)
            .bind(query.customer_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(OrderPage { data, total })
    }

    /// All orders of one customer with their lines, newest first.
    pub async fn list_for_customer(&self, business_id: i64, customer_id: i64) -> DbResult<Vec<OrderWithItems>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE business_id = ?1 AND customer_id = ?2 \
             ORDER BY created_at DESC, id DESC",
            ORDER_COLUMNS
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(business_id)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        let mut result = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.items(order.id).await?;
            result.push(OrderWithItems { order, items });
        }

        Ok(result)
    }

    pub async fn totals(&self, business_id: i64) -> DbResult<OrderTotals> {
        let (order_count, revenue_cents): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN status != 'cancelled' THEN total_cents ELSE 0 END), 0)
            FROM orders
            WHERE business_id = ?1
            "#,
        )
        .bind(business_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(OrderTotals {
            order_count,
            revenue_cents,
        })
    }

    /// Moves an order to `next` if the transition is legal.
    ///
    /// ## Returns
    /// * `Ok(StatusChange::Updated)` - moved
    /// * `Ok(StatusChange::Unchanged)` - already in `next`
    /// * `Err(DbError::NotFound)` - no such order in this business
    /// * `Err(DbError::Rule(InvalidStatusTransition))` - illegal move
    pub async fn update_status(&self, business_id: i64, order_id: i64, next: OrderStatus) -> DbResult<StatusChange> {
        let mut conn = self.pool.acquire().await?;

        let moved = move_status(&mut conn, business_id, order_id, next).await?;
        if moved {
            info!(order_id, business_id, status = %next, "Order status updated");
            return Ok(StatusChange::Updated);
        }

        match current_status(&mut conn, business_id, order_id).await? {
            None => Err(DbError::not_found("Order", order_id)),
            Some(current) if current == next => {
                debug!(order_id, status = %next, "Status already set");
                Ok(StatusChange::Unchanged)
            }
            Some(current) => Err(CoreError::InvalidStatusTransition {
                order_id,
                from: current,
                to: next,
            }
            .into()),
        }
    }

    /// Marks an order cancelled without touching stock or loyalty.
    ///
    /// The sold quantities stay deducted and the customer keeps the points.
    pub async fn mark_cancelled_only(&self, business_id: i64, order_id: i64) -> DbResult<StatusChange> {
        self.update_status(business_id, order_id, OrderStatus::Cancelled).await
    }

    /// Cancels an order and reverses its effects in one transaction.
    ///
    /// Each line's quantity is restocked with a `cancellation` movement and
    /// the points awarded at creation are taken back, never below zero.
    /// Only `pending` and `confirmed` orders can be reversed; an order that is
    /// already cancelled is rejected so stock is never restored twice.
    pub async fn cancel_with_reversal(&self, business_id: i64, order_id: i64) -> DbResult<CancelledOrder> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        if !move_status(&mut tx, business_id, order_id, OrderStatus::Cancelled).await? {
            return Err(match current_status(&mut tx, business_id, order_id).await? {
                None => DbError::not_found("Order", order_id),
                Some(current) => CoreError::InvalidStatusTransition {
                    order_id,
                    from: current,
                    to: OrderStatus::Cancelled,
                }
                .into(),
            });
        }

        let (customer_id, points_awarded): (Option<i64>, i64) = sqlx::query_as(
            "SELECT customer_id, loyalty_points_awarded FROM orders WHERE id = ?1",
        )
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        let lines: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT product_id, quantity FROM order_items WHERE order_id = ?1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut restored = Vec::with_capacity(lines.len());
        for (product_id, quantity) in lines {
            let level = apply_stock_delta(
                &mut *tx,
                &StockChange::cancellation(product_id, quantity, order_id),
                StockPolicy::permissive(),
            )
            .await?;
            restored.push(level);
        }

        let mut points_reversed = 0;
        if let Some(customer_id) = customer_id.filter(|_| points_awarded > 0) {
            let balance: Option<i64> =
                sqlx::query_scalar("SELECT loyalty_points FROM customers WHERE id = ?1")
                    .bind(customer_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            if let Some(balance) = balance {
                points_reversed = points_awarded.min(balance);
                if points_reversed < points_awarded {
                    warn!(
                        order_id,
                        customer_id,
                        points_awarded,
                        balance,
                        "Customer balance lower than points awarded, clamping reversal at zero"
                    );
                }

                sqlx::query("UPDATE customers SET loyalty_points = loyalty_points - ?1 WHERE id = ?2")
                    .bind(points_reversed)
                    .bind(customer_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await.map_err(DbError::transaction)?;

        info!(
            order_id,
            business_id,
            lines = restored.len(),
            points_reversed,
            "Order cancelled with reversal"
        );

        Ok(CancelledOrder {
            order_id,
            business_id,
            restored,
            customer_id,
            points_reversed,
        })
    }
}

/// Conditional status write. `true` when the row moved.
async fn move_status(
    conn: &mut SqliteConnection,
    business_id: i64,
    order_id: i64,
    next: OrderStatus,
) -> DbResult<bool> {
    let predecessors = OrderStatus::predecessors(next);
    if predecessors.is_empty() {
        return Ok(false);
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE orders SET status = ");
    builder.push_bind(next);
    builder.push(", updated_at = ");
    builder.push_bind(Utc::now());
    builder.push(" WHERE id = ");
    builder.push_bind(order_id);
    builder.push(" AND business_id = ");
    builder.push_bind(business_id);
    builder.push(" AND status IN (");
    let mut separated = builder.separated(", ");
    for status in predecessors {
        separated.push_bind(status);
    }
    separated.push_unseparated(")");

    let result = builder.build().execute(&mut *conn).await?;
    Ok(result.rows_affected() == 1)
}

async fn current_status(
    conn: &mut SqliteConnection,
    business_id: i64,
    order_id: i64,
) -> DbResult<Option<OrderStatus>> {
    let status: Option<OrderStatus> =
        sqlx::query_scalar("SELECT status FROM orders WHERE id = ?1 AND business_id = ?2")
        .bind(order_id)
        .bind(business_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(status)
}

fn missing_customer(err: sqlx::Error, customer_id: Option<i64>) -> DbError {
    match (DbError::from(err), customer_id) {
        (DbError::ForeignKeyViolation { .. }, Some(id)) => DbError::not_found("Customer", id),
        (other, _) => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
