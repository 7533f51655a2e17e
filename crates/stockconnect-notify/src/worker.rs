//! # Side-Effect Worker
//!
//! Runs post-commit work on its own task so a committed order never waits
//! on, or fails because of, a notification.
//!
//! ## Queue Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  request task                       worker task                         │
//! │  ────────────                       ───────────                         │
//! │  commit                                                                 │
//! │  queue.submit(task) ──try_send──►  mpsc (bounded)                       │
//! │     │  full / closed                    │                               │
//! │     └──► warn!, task dropped            ▼                               │
//! │                                    process sequentially                 │
//! │                                      CheckLowStock → LowStockNotifier   │
//! │                                      Emit          → EventHub           │
//! │                                                                         │
//! │  handle.shutdown() ──────────────► close queue, drain what is buffered, │
//! │                                    return                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{NotifyError, NotifyResult};
use crate::event::{EventHub, RealtimeEvent};
use crate::low_stock::LowStockNotifier;

/// One unit of post-commit work.
#[derive(Debug, Clone)]
pub enum SideEffectTask {
    CheckLowStock { product_id: i64, business_id: i64 },
    Emit(RealtimeEvent),
}

// =============================================================================
// Queue (producer side)
// =============================================================================

/// Cloneable producer half. Submitting never waits.
#[derive(Debug, Clone)]
pub struct SideEffectQueue {
    tx: mpsc::Sender<SideEffectTask>,
}

impl SideEffectQueue {
    /// Enqueues a task, or drops it with a warning when the queue is full or
    /// the worker has stopped.
    pub fn submit(&self, task: SideEffectTask) {
        if let Err(e) = self.try_submit(task) {
            warn!(error = %e, "Side-effect task dropped");
        }
    }

    /// Enqueues a task and reports why it was refused.
    pub fn try_submit(&self, task: SideEffectTask) -> NotifyResult<()> {
        self.tx.try_send(task).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => NotifyError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => NotifyError::QueueClosed,
        })
    }

    pub fn check_low_stock(&self, product_id: i64, business_id: i64) {
        self.submit(SideEffectTask::CheckLowStock {
            product_id,
            business_id,
        });
    }

    pub fn emit(&self, event: RealtimeEvent) {
        self.submit(SideEffectTask::Emit(event));
    }
}

// =============================================================================
// Worker (consumer side)
// =============================================================================

pub struct SideEffectWorker {
    rx: mpsc::Receiver<SideEffectTask>,
    shutdown_rx: mpsc::Receiver<()>,
    notifier: LowStockNotifier,
    hub: EventHub,
}

/// Handle for stopping the worker.
#[derive(Debug, Clone)]
pub struct SideEffectWorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl SideEffectWorkerHandle {
    /// Asks the worker to drain its queue and stop.
    pub async fn shutdown(&self) -> NotifyResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| NotifyError::QueueClosed)
    }
}

impl SideEffectWorker {
    /// Creates the worker, its producer queue and its shutdown handle.
    ///
    /// Dropping every handle clone also stops the worker.
    pub fn new(
        notifier: LowStockNotifier,
        hub: EventHub,
        capacity: usize,
    ) -> (Self, SideEffectQueue, SideEffectWorkerHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let worker = SideEffectWorker {
            rx,
            shutdown_rx,
            notifier,
            hub,
        };

        (worker, SideEffectQueue { tx }, SideEffectWorkerHandle { shutdown_tx })
    }

    /// Runs until shutdown. Spawn this on its own task.
    pub async fn run(mut self) {
        info!("Side-effect worker starting");

        loop {
            tokio::select! {
                task = self.rx.recv() => match task {
                    Some(task) => self.process(task).await,
                    None => break,
                },

                _ = self.shutdown_rx.recv() => {
                    info!("Side-effect worker shutting down, draining queue");
                    self.rx.close();
                    let mut drained = 0;
                    while let Some(task) = self.rx.recv().await {
                        self.process(task).await;
                        drained += 1;
                    }
                    debug!(drained, "Queue drained");
                    break;
                }
            }
        }

        info!("Side-effect worker stopped");
    }

    async fn process(&self, task: SideEffectTask) {
        match task {
            SideEffectTask::CheckLowStock {
                product_id,
                business_id,
            } => {
                self.notifier.check_and_notify(product_id, business_id).await;
            }
            SideEffectTask::Emit(event) => {
                self.hub.emit(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::NotifyConfig;
    use crate::dispatcher::RecordingDispatcher;
    use crate::event::EventKind;
    use stockconnect_db::{Database, DbConfig, NewProduct};

    async fn setup(
        capacity: usize,
    ) -> (Database, RecordingDispatcher, EventHub, SideEffectWorker, SideEffectQueue, SideEffectWorkerHandle) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let dispatcher = RecordingDispatcher::new();
        let hub = EventHub::new(16);
        let notifier = LowStockNotifier::new(
            db.clone(),
            Arc::new(dispatcher.clone()),
            Arc::new(NotifyConfig::default()),
        );
        let (worker, queue, handle) = SideEffectWorker::new(notifier, hub.clone(), capacity);
        (db, dispatcher, hub, worker, queue, handle)
    }

    #[tokio::test]
    async fn test_worker_processes_tasks_in_order() {
        let (db, dispatcher, hub, worker, queue, handle) = setup(8).await;
        let business = db.businesses().create("Shop", None).await.unwrap().id;
        let product = db
            .products()
            .create(
                business,
                &NewProduct {
                    name: "Rice".into(),
                    quantity: 1,
                    supplier_phone: Some("08031234567".into()),
                    ..NewProduct::default()
                },
            )
            .await
            .unwrap();

        let mut events = hub.subscribe(business);
        let join = tokio::spawn(worker.run());

        queue.check_low_stock(product.id, business);
        queue.emit(RealtimeEvent::sale_completed(business, 5));

        let event = events.recv().await.unwrap();
        assert_eq!(
            event.kind,
            EventKind::SaleCompleted {
                order_id: 5,
                business_id: business
            }
        );
        // Sequential: the low-stock check ran before the event was emitted
        assert_eq!(dispatcher.messages().len(), 1);

        handle.shutdown().await.unwrap();
        join.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let (_db, _dispatcher, hub, worker, queue, handle) = setup(8).await;
        let mut events = hub.subscribe(1);

        for order_id in 0..3 {
            queue.emit(RealtimeEvent::sale_completed(1, order_id));
        }
        handle.shutdown().await.unwrap();

        worker.run().await;

        for _ in 0..3 {
            assert!(events.recv().await.is_some());
        }
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_waiting() {
        let (_db, _dispatcher, _hub, _worker, queue, _handle) = setup(1).await;

        queue.try_submit(SideEffectTask::Emit(RealtimeEvent::sale_completed(1, 1))).unwrap();
        let err = queue
            .try_submit(SideEffectTask::Emit(RealtimeEvent::sale_completed(1, 2)))
            .unwrap_err();
        assert!(matches!(err, NotifyError::QueueFull));

        // The infallible form only logs
        queue.emit(RealtimeEvent::sale_completed(1, 3));
    }

    #[tokio::test]
    async fn test_closed_queue_reports_closed() {
        let (_db, _dispatcher, _hub, worker, queue, _handle) = setup(4).await;
        drop(worker);

        let err = queue
            .try_submit(SideEffectTask::CheckLowStock {
                product_id: 1,
                business_id: 1,
            })
            .unwrap_err();
        assert!(matches!(err, NotifyError::QueueClosed));
    }
}
