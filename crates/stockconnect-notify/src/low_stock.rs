//! # Low-Stock Notifier
//!
//! Texts a product's supplier when its quantity reaches the reorder
//! threshold.
//!
//! ## Decision Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  evaluate(product_id, business_id)                                      │
//! │       │                                                                 │
//! │       ├── settings.low_stock_notifications off ──► Disabled             │
//! │       ├── product gone / other business ─────────► ProductMissing       │
//! │       ├── quantity > reorder_threshold ──────────► AboveThreshold       │
//! │       ├── no supplier phone ─────────────────────► NoSupplierPhone      │
//! │       ▼                                                                 │
//! │  normalise phone (+234 default), build alert text                       │
//! │       │                                                                 │
//! │       ├── dispatcher reports success ────────────► Notified             │
//! │       └── dispatcher reports failure ────────────► DispatchFailed       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`LowStockNotifier::check_and_notify`] wraps this and never fails.

use std::sync::Arc;

use tracing::{debug, info, warn};

use stockconnect_core::validation::normalize_phone_number;
use stockconnect_core::Product;
use stockconnect_db::Database;

use crate::config::NotifyConfig;
use crate::dispatcher::MessageDispatcher;
use crate::error::NotifyResult;

/// What one low-stock check did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LowStockOutcome {
    Disabled,
    ProductMissing,
    AboveThreshold,
    NoSupplierPhone,
    Notified { to: String, message: String },
    DispatchFailed { to: String, reason: String },
}

/// The alert text sent to a supplier.
pub fn alert_message(product_name: &str, quantity: i64, business_name: &str) -> String {
    format!(
        "Low Stock Alert: {} is down to {} units at {}. Please restock soon.",
        product_name, quantity, business_name
    )
}

#[derive(Clone)]
pub struct LowStockNotifier {
    db: Database,
    dispatcher: Arc<dyn MessageDispatcher>,
    config: Arc<NotifyConfig>,
}

impl LowStockNotifier {
    pub fn new(db: Database, dispatcher: Arc<dyn MessageDispatcher>, config: Arc<NotifyConfig>) -> Self {
        LowStockNotifier {
            db,
            dispatcher,
            config,
        }
    }

    /// Runs a check and logs the outcome. Errors are logged, never returned.
    pub async fn check_and_notify(&self, product_id: i64, business_id: i64) {
        match self.evaluate(product_id, business_id).await {
            Ok(LowStockOutcome::Notified { to, .. }) => {
                info!(product_id, business_id, to = %to, "Low-stock alert sent");
            }
            Ok(LowStockOutcome::DispatchFailed { to, reason }) => {
                warn!(product_id, business_id, to = %to, reason = %reason, "Low-stock alert not delivered");
            }
            Ok(outcome) => {
                debug!(product_id, business_id, ?outcome, "Low-stock check finished");
            }
            Err(e) => {
                warn!(product_id, business_id, error = %e, "Low-stock check failed");
            }
        }
    }

    /// Runs a check and reports exactly what happened.
    pub async fn evaluate(&self, product_id: i64, business_id: i64) -> NotifyResult<LowStockOutcome> {
        let settings = self.db.settings().get_or_create(business_id).await?;
        if !settings.low_stock_notifications {
            return Ok(LowStockOutcome::Disabled);
        }

        let product = match self.db.products().get(business_id, product_id).await? {
            Some(product) => product,
            None => return Ok(LowStockOutcome::ProductMissing),
        };

        if !product.is_low_stock() {
            return Ok(LowStockOutcome::AboveThreshold);
        }

        let Some(raw_phone) = supplier_phone(&product) else {
            return Ok(LowStockOutcome::NoSupplierPhone);
        };

        let business_name = self
            .db
            .businesses()
            .get(business_id)
            .await?
            .map(|b| b.name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.config.fallback_business_name.clone());

        let to = normalize_phone_number(raw_phone, &self.config.default_country_code);
        let message = alert_message(&product.name, product.quantity, &business_name);

        let report = self.dispatcher.send_message(&to, &message).await;
        if report.success {
            Ok(LowStockOutcome::Notified { to, message })
        } else {
            Ok(LowStockOutcome::DispatchFailed {
                to,
                reason: report.error.unwrap_or_else(|| "unknown error".to_string()),
            })
        }
    }
}

fn supplier_phone(product: &Product) -> Option<&str> {
    product
        .supplier_phone
        .as_deref()
        .map(str::trim)
        .filter(|phone| !phone.is_empty())
}
