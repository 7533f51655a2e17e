//! # Stock Adjustment Engine
//!
//! The only code path that changes `products.quantity`.
//!
//! ## Engine Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_stock_delta(conn, change, policy)                                │
//! │                                                                         │
//! │  1. UPDATE products SET quantity = quantity + delta                     │
//! │        WHERE id = ? AND (negative allowed OR result >= 0)               │
//! │        RETURNING quantity                                               │
//! │        │                                                                │
//! │        ├── no row, product exists  → InsufficientStock                  │
//! │        ├── no row, no product      → NotFound                           │
//! │        ▼                                                                │
//! │  2. INSERT INTO stock_movements (same delta, reason, order_id)          │
//! │                                                                         │
//! │  Both statements run on the caller's connection. Callers wrap them in  │
//! │  a transaction: the order coordinator uses its own, manual adjustments │
//! │  go through StockRepository::adjust_stock.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The check and the write are one statement, so two concurrent sales can
//! never both pass a floor check against the same stale quantity.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use stockconnect_core::{CoreError, StockAudit, StockLevel, StockMovement, StockPolicy, StockReason};

/// One requested change to a product's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub product_id: i64,
    /// Signed delta: negative removes stock.
    pub delta: i64,
    pub reason: StockReason,
    pub order_id: Option<i64>,
}

impl StockChange {
    /// A manual change not tied to an order.
    pub fn manual(product_id: i64, delta: i64, reason: StockReason) -> Self {
        StockChange {
            product_id,
            delta,
            reason,
            order_id: None,
        }
    }

    /// Stock leaving with an order line.
    pub fn sale(product_id: i64, quantity: i64, order_id: i64) -> Self {
        StockChange {
            product_id,
            delta: -quantity,
            reason: StockReason::Sale,
            order_id: Some(order_id),
        }
    }

    /// Stock returning because an order was cancelled.
    pub fn cancellation(product_id: i64, quantity: i64, order_id: i64) -> Self {
        StockChange {
            product_id,
            delta: quantity,
            reason: StockReason::Cancellation,
            order_id: Some(order_id),
        }
    }
}

/// Applies one stock change and records its movement.
///
/// Must be called inside a transaction; on error the caller drops it and
/// nothing from this call persists.
pub async fn apply_stock_delta(
    conn: &mut SqliteConnection,
    change: &StockChange,
    policy: StockPolicy,
) -> DbResult<StockLevel> {
    let now = Utc::now();

    let updated: Option<(i64, i64)> = sqlx::query_as(
        r#"
        UPDATE products
        SET quantity = quantity + ?2, updated_at = ?3
        WHERE id = ?1
          AND (?4 OR ?2 >= 0 OR quantity + ?2 >= 0)
        RETURNING quantity, reorder_threshold
        "#,
    )
    .bind(change.product_id)
    .bind(change.delta)
    .bind(now)
    .bind(policy.allow_negative_stock)
    .fetch_optional(&mut *conn)
    .await?;

    let (quantity, reorder_threshold) = match updated {
        Some(row) => row,
        None => {
            let available: Option<i64> =
                sqlx::query_scalar("SELECT quantity FROM products WHERE id = ?1")
                    .bind(change.product_id)
                    .fetch_optional(&mut *conn)
                    .await?;

            return Err(match available {
                Some(available) => CoreError::InsufficientStock {
                    product_id: change.product_id,
                    available,
                    requested: -change.delta,
                }
                .into(),
                None => DbError::not_found("Product", change.product_id),
            });
        }
    };

    sqlx::query(
        r#"
        INSERT INTO stock_movements (product_id, order_id, change_amount, reason, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(change.product_id)
    .bind(change.order_id)
    .bind(change.delta)
    .bind(change.reason)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    debug!(
        product_id = change.product_id,
        delta = change.delta,
        reason = %change.reason,
        quantity,
        "Stock adjusted"
    );

    Ok(StockLevel {
        product_id: change.product_id,
        quantity,
        reorder_threshold,
    })
}

// =============================================================================
// Repository
// =============================================================================

/// Manual stock adjustments and the movement ledger.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Adjusts a product's quantity in its own transaction.
    ///
    /// Ownership of `product_id` is checked by the caller.
    ///
    /// ## Returns
    /// * `Ok(StockLevel)` - the new quantity
    /// * `Err(DbError::NotFound)` - no such product
    /// * `Err(DbError::Rule(InsufficientStock))` - floor policy refused it
    pub async fn adjust_stock(
        &self,
        product_id: i64,
        delta: i64,
        reason: StockReason,
        policy: StockPolicy,
    ) -> DbResult<StockLevel> {
        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let level = apply_stock_delta(
            &mut *tx,
            &StockChange::manual(product_id, delta, reason),
            policy,
        )
        .await?;

        tx.commit().await.map_err(DbError::transaction)?;

        info!(product_id, delta, reason = %reason, quantity = level.quantity, "Manual stock adjustment");
        Ok(level)
    }

    /// Lists movements for a business, newest first.
    pub async fn movements(
        &self,
        business_id: i64,
        product_id: Option<i64>,
        limit: i64,
    ) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT m.id, m.product_id, m.order_id, m.change_amount, m.reason, m.created_at
            FROM stock_movements m
            INNER JOIN products p ON p.id = m.product_id
            WHERE p.business_id = ?1
              AND (?2 IS NULL OR m.product_id = ?2)
            ORDER BY m.id DESC
            LIMIT ?3
            "#,
        )
        .bind(business_id)
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Reconciles a product's quantity against its ledger.
    pub async fn audit(&self, product_id: i64) -> DbResult<StockAudit> {
        let row: Option<(i64, i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT p.id,
                   p.initial_quantity,
                   COALESCE((SELECT SUM(change_amount) FROM stock_movements WHERE product_id = p.id), 0),
                   p.quantity
            FROM products p
            WHERE p.id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        let (product_id, initial_quantity, movements_total, quantity) =
            row.ok_or_else(|| DbError::not_found("Product", product_id))?;

        Ok(StockAudit {
            product_id,
            initial_quantity,
            movements_total,
            quantity,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
