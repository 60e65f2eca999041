// src/notify/mod.rs
pub mod governor;
pub mod render;
pub mod retry;
pub mod telegram;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use governor::{DeliveryGovernor, DeliveryReport};
pub use render::render_message;
pub use retry::{RetryPolicy, RetryState, RetryStep};
pub use telegram::TelegramNotifier;

/// Failure class of one send attempt. Only transient failures are retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("transient: {message}")]
    Transient {
        message: String,
        /// Server-requested wait (e.g. HTTP 429 `retry_after`).
        retry_after: Option<Duration>,
    },
    #[error("permanent: {message}")]
    Permanent { message: String },
}

impl TransportError {
    pub fn transient(message: impl Into<String>) -> Self {
        TransportError::Transient {
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        TransportError::Permanent {
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Transient { .. })
    }
}

/// Delivery channel. Receives an already rendered message.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), TransportError>;
}
