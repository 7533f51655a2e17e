//! # Real-time Event Hub
//!
//! Fan-out of post-commit events to dashboard subscribers.
//!
//! ## Event Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  SideEffectWorker ──emit──► broadcast::Sender<RealtimeEvent>            │
//! │                                   │                                     │
//! │                 ┌─────────────────┼─────────────────┐                   │
//! │                 ▼                 ▼                 ▼                   │
//! │         EventSubscription  EventSubscription  EventSubscription         │
//! │         (business 1)       (business 1)       (business 2)              │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │   {"event":"sale_completed","data":{"orderId":7,"businessId":1}}        │
//! │                                                                         │
//! │  No subscribers is normal. A subscriber that falls more than the       │
//! │  channel capacity behind skips the oldest events.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use stockconnect_core::{OrderStatus, StockReason};

/// Payload of a real-time event, serialized as `{"event": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum EventKind {
    /// An order committed.
    #[serde(rename_all = "camelCase")]
    SaleCompleted { order_id: i64, business_id: i64 },

    /// An order moved to a new status.
    #[serde(rename_all = "camelCase")]
    OrderStatusUpdated { order_id: i64, status: OrderStatus },

    /// A manual adjustment changed a product's quantity.
    #[serde(rename_all = "camelCase")]
    StockAdjusted {
        product_id: i64,
        quantity: i64,
        reason: StockReason,
    },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::SaleCompleted { .. } => "sale_completed",
            EventKind::OrderStatusUpdated { .. } => "order_status_updated",
            EventKind::StockAdjusted { .. } => "stock_adjusted",
        }
    }
}

/// An event addressed to one business.
#[derive(Debug, Clone)]
pub struct RealtimeEvent {
    pub id: Uuid,
    pub business_id: i64,
    pub emitted_at: DateTime<Utc>,
    pub kind: EventKind,
}

impl RealtimeEvent {
    pub fn new(business_id: i64, kind: EventKind) -> Self {
        RealtimeEvent {
            id: Uuid::new_v4(),
            business_id,
            emitted_at: Utc::now(),
            kind,
        }
    }

    pub fn sale_completed(business_id: i64, order_id: i64) -> Self {
        Self::new(
            business_id,
            EventKind::SaleCompleted {
                order_id,
                business_id,
            },
        )
    }

    pub fn order_status_updated(business_id: i64, order_id: i64, status: OrderStatus) -> Self {
        Self::new(business_id, EventKind::OrderStatusUpdated { order_id, status })
    }

    /// The wire form sent to subscribers.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.kind)
    }
}

// =============================================================================
// Hub
// =============================================================================

/// Cloneable publisher. Every clone publishes on the same channel.
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<RealtimeEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        EventHub { tx }
    }

    /// Publishes an event. Returns how many subscribers received it.
    pub fn emit(&self, event: RealtimeEvent) -> usize {
        let name = event.kind.name();
        let business_id = event.business_id;

        match self.tx.send(event) {
            Ok(receivers) => {
                debug!(event = name, business_id, receivers, "Event emitted");
                receivers
            }
            Err(_) => {
                debug!(event = name, business_id, "Event emitted with no subscribers");
                0
            }
        }
    }

    /// Subscribes to one business's events.
    pub fn subscribe(&self, business_id: i64) -> EventSubscription {
        EventSubscription {
            business_id,
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A per-business view of the hub.
#[derive(Debug)]
pub struct EventSubscription {
    business_id: i64,
    rx: broadcast::Receiver<RealtimeEvent>,
}

impl EventSubscription {
    /// Waits for the next event for this business. `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<RealtimeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.business_id == self.business_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(business_id = self.business_id, skipped, "Event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let event = RealtimeEvent::sale_completed(3, 42);
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"event": "sale_completed", "data": {"orderId": 42, "businessId": 3}})
        );

        let event = RealtimeEvent::order_status_updated(3, 42, OrderStatus::Delivered);
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"event": "order_status_updated", "data": {"orderId": 42, "status": "delivered"}})
        );
    }

    #[test]
    fn test_emit_without_subscribers() {
        let hub = EventHub::new(8);
        assert_eq!(hub.emit(RealtimeEvent::sale_completed(1, 1)), 0);
    }

    #[tokio::test]
    async fn test_subscription_filters_by_business() {
        let hub = EventHub::new(8);
        let mut mine = hub.subscribe(1);

        hub.emit(RealtimeEvent::sale_completed(2, 10));
        hub.emit(RealtimeEvent::sale_completed(1, 11));

        let event = mine.recv().await.unwrap();
        assert_eq!(event.kind.name(), "sale_completed");
        assert_eq!(
            event.kind,
            EventKind::SaleCompleted {
                order_id: 11,
                business_id: 1
            }
        );
    }

    #[tokio::test]
    async fn test_subscription_ends_with_hub() {
        let hub = EventHub::new(8);
        let mut sub = hub.subscribe(1);
        drop(hub);
        assert!(sub.recv().await.is_none());
    }
}
