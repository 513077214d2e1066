//! Mail transport trait and error types

use crate::domain::OutgoingMessage;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Transport error types. Every variant is eligible for retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Provider returned status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("not implemented")]
    NotImplemented,
}

/// Trait for mail transports
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver one rendered message.
    ///
    /// `timeout` bounds the attempt; implementations pass it on to the
    /// underlying client where the client supports a deadline.
    async fn send(&self, message: &OutgoingMessage, timeout: Duration)
        -> Result<(), TransportError>;

    /// Get the transport name
    fn name(&self) -> &'static str;
}
