//! # Notify Error Types
//!
//! Errors inside the side-effect pipeline. None of them ever reach an HTTP
//! caller: the worker logs them and moves on.

use thiserror::Error;

use stockconnect_db::DbError;

pub type NotifyResult<T> = Result<T, NotifyError>;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// A read needed to build a notification failed.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// The messaging provider refused or failed to send.
    #[error("Dispatch to {to} failed: {reason}")]
    DispatchFailed { to: String, reason: String },

    /// The side-effect queue has no room; the task was dropped.
    #[error("Side-effect queue is full")]
    QueueFull,

    /// The worker has stopped; the task was dropped.
    #[error("Side-effect queue is closed")]
    QueueClosed,

    #[error("Invalid notify configuration: {0}")]
    InvalidConfig(String),
}

impl NotifyError {
    /// Whether retrying the same operation later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, NotifyError::QueueFull | NotifyError::DispatchFailed { .. })
    }
}
