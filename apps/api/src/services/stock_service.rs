//! # Stock Service
//!
//! Manual stock adjustments from the dashboard: restocks, damage, losses
//! and corrections. Sales and cancellations move stock only through the
//! order service.

use tracing::info;

use stockconnect_core::validation::validate_stock_delta;
use stockconnect_core::{OrderPolicy, StockLevel, StockReason, ValidationError};
use stockconnect_db::Database;
use stockconnect_notify::{EventKind, RealtimeEvent, SideEffectQueue};

use crate::error::{ApiError, ApiResult};

pub struct StockService {
    db: Database,
    queue: SideEffectQueue,
    policy: OrderPolicy,
}

impl StockService {
    pub fn new(db: Database, queue: SideEffectQueue, policy: OrderPolicy) -> Self {
        StockService { db, queue, policy }
    }

    /// Applies a non-zero delta to one of the business's products.
    ///
    /// ## Returns
    /// * `Ok(StockLevel)` - the new quantity, with a movement recorded
    /// * `Err(Validation)` - zero delta, or a reason reserved for orders
    /// * `Err(NotFound)` - product missing or owned by another business
    /// * `Err(InsufficientStock)` - the floor policy refused a decrement
    pub async fn adjust(
        &self,
        business_id: i64,
        product_id: i64,
        delta: i64,
        reason: StockReason,
    ) -> ApiResult<StockLevel> {
        validate_stock_delta(delta)?;
        if matches!(reason, StockReason::Sale | StockReason::Cancellation) {
            return Err(ValidationError::NotAllowed {
                field: "reason".to_string(),
                allowed: manual_reasons(),
            }
            .into());
        }

        if self.db.products().get(business_id, product_id).await?.is_none() {
            return Err(ApiError::not_found(format!("Product {} not found", product_id)));
        }

        let level = self
            .db
            .stock()
            .adjust_stock(product_id, delta, reason, self.policy.stock)
            .await?;

        if delta < 0 {
            self.queue.check_low_stock(product_id, business_id);
        }
        self.queue.emit(RealtimeEvent::new(
            business_id,
            EventKind::StockAdjusted {
                product_id,
                quantity: level.quantity,
                reason,
            },
        ));

        info!(product_id, business_id, delta, quantity = level.quantity, "Stock adjusted");
        Ok(level)
    }

    /// Queues a low-stock check after a product's threshold or details
    /// changed.
    pub fn recheck(&self, business_id: i64, product_id: i64) {
        self.queue.check_low_stock(product_id, business_id);
    }
}

fn manual_reasons() -> Vec<String> {
    StockReason::ALL
        .iter()
        .filter(|r| !matches!(r, StockReason::Sale | StockReason::Cancellation))
        .map(|r| r.as_str().to_string())
        .collect()
}
