//! # Message Dispatcher
//!
//! The seam to an SMS/WhatsApp provider. StockConnect ships without a
//! provider: [`LogDispatcher`] writes each message to the log, and
//! [`RecordingDispatcher`] keeps them in memory for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// Outcome of one send. Providers report failure here rather than erroring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchReport {
    pub fn sent() -> Self {
        DispatchReport {
            success: true,
            error: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        DispatchReport {
            success: false,
            error: Some(reason.into()),
        }
    }
}

/// Sends a text message to an international phone number.
#[async_trait]
pub trait MessageDispatcher: Send + Sync {
    async fn send_message(&self, to: &str, body: &str) -> DispatchReport;
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogDispatcher;

#[async_trait]
impl MessageDispatcher for LogDispatcher {
    async fn send_message(&self, to: &str, body: &str) -> DispatchReport {
        info!(to, body, "Outbound message");
        DispatchReport::sent()
    }
}

/// A message captured by [`RecordingDispatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub body: String,
}

/// Keeps every message in memory; optionally reports failure.
#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    fail_with: Option<String>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher whose every send reports `reason` as the failure.
    pub fn failing(reason: impl Into<String>) -> Self {
        RecordingDispatcher {
            sent: Arc::default(),
            fail_with: Some(reason.into()),
        }
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessageDispatcher for RecordingDispatcher {
    async fn send_message(&self, to: &str, body: &str) -> DispatchReport {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentMessage {
                to: to.to_string(),
                body: body.to_string(),
            });
        }

        match &self.fail_with {
            Some(reason) => DispatchReport::failed(reason.clone()),
            None => DispatchReport::sent(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_dispatcher_captures_messages() {
        let dispatcher = RecordingDispatcher::new();
        let report = dispatcher.send_message("+2348030000000", "hello").await;

        assert!(report.success);
        assert_eq!(
            dispatcher.messages(),
            vec![SentMessage {
                to: "+2348030000000".into(),
                body: "hello".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_failing_dispatcher_reports_error() {
        let dispatcher = RecordingDispatcher::failing("provider down");
        let report = dispatcher.send_message("+2348030000000", "hello").await;

        assert_eq!(report, DispatchReport::failed("provider down"));
        assert_eq!(dispatcher.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_log_dispatcher_always_succeeds() {
        assert!(LogDispatcher.send_message("+1", "x").await.success);
    }
}
