//! Shared application state, cloned into every handler.

use std::sync::Arc;

use stockconnect_core::OrderPolicy;
use stockconnect_db::Database;
use stockconnect_notify::{EventHub, SideEffectQueue};

use crate::config::ApiConfig;
use crate::services::{OrderService, StockService};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub queue: SideEffectQueue,
    pub hub: EventHub,
    pub policy: OrderPolicy,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(db: Database, queue: SideEffectQueue, hub: EventHub, config: Arc<ApiConfig>) -> Self {
        AppState {
            db,
            queue,
            hub,
            policy: config.order_policy(),
            config,
        }
    }

    pub fn country_code(&self) -> &str {
        &self.config.default_country_code
    }

    pub fn orders(&self) -> OrderService {
        OrderService::new(self.db.clone(), self.queue.clone(), self.policy)
    }

    pub fn stock(&self) -> StockService {
        StockService::new(self.db.clone(), self.queue.clone(), self.policy)
    }
}
