//! # stockconnect-notify: Post-Commit Side Effects
//!
//! Low-stock alerts and real-time events, run after a transaction commits
//! and never able to roll it back.
//!
//! ## Module Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  worker.rs      SideEffectQueue (producer) / SideEffectWorker (task)    │
//! │  low_stock.rs   LowStockNotifier: threshold check + supplier alert      │
//! │  dispatcher.rs  MessageDispatcher trait, log and recording impls        │
//! │  event.rs       EventHub broadcast + per-business subscriptions         │
//! │  config.rs      NotifyConfig (capacities, country code)                 │
//! │  error.rs       NotifyError                                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let hub = EventHub::new(config.event_capacity);
//! let notifier = LowStockNotifier::new(db.clone(), Arc::new(LogDispatcher), config.clone());
//! let (worker, queue, handle) = SideEffectWorker::new(notifier, hub.clone(), config.queue_capacity);
//! let join = tokio::spawn(worker.run());
//!
//! queue.check_low_stock(product_id, business_id);
//!
//! handle.shutdown().await?;
//! join.await?;
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod low_stock;
pub mod worker;

pub use config::NotifyConfig;
pub use dispatcher::{DispatchReport, LogDispatcher, MessageDispatcher, RecordingDispatcher, SentMessage};
pub use error::{NotifyError, NotifyResult};
pub use event::{EventHub, EventKind, EventSubscription, RealtimeEvent};
pub use low_stock::{alert_message, LowStockNotifier, LowStockOutcome};
pub use worker::{SideEffectQueue, SideEffectTask, SideEffectWorker, SideEffectWorkerHandle};
