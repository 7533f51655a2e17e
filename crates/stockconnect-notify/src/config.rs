//! # Notify Configuration
//!
//! Plain settings handed in by the binary; this crate reads no environment.

use stockconnect_core::validation::DEFAULT_COUNTRY_CODE;
use stockconnect_core::DEFAULT_BUSINESS_NAME;

use crate::error::{NotifyError, NotifyResult};

/// Default capacity of the side-effect queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default capacity of the real-time broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Bounded queue size. Submissions beyond it are dropped with a warning.
    pub queue_capacity: usize,

    /// Broadcast buffer per subscriber. Slow subscribers skip old events.
    pub event_capacity: usize,

    /// Prefixed to supplier phones that lack a `+`.
    pub default_country_code: String,

    /// Used in alert text when the business row has no name.
    pub fallback_business_name: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        NotifyConfig {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            default_country_code: DEFAULT_COUNTRY_CODE.to_string(),
            fallback_business_name: DEFAULT_BUSINESS_NAME.to_string(),
        }
    }
}

impl NotifyConfig {
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn default_country_code(mut self, code: impl Into<String>) -> Self {
        self.default_country_code = code.into();
        self
    }

    pub fn validate(&self) -> NotifyResult<()> {
        if self.queue_capacity == 0 {
            return Err(NotifyError::InvalidConfig(
                "queue capacity must be at least 1".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(NotifyError::InvalidConfig(
                "event capacity must be at least 1".to_string(),
            ));
        }
        if !self.default_country_code.starts_with('+') {
            return Err(NotifyError::InvalidConfig(format!(
                "country code '{}' must start with '+'",
                self.default_country_code
            )));
        }
        Ok(())
    }
}
