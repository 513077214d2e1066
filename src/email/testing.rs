//! Transport used in testing mode

use super::provider::{MailTransport, TransportError};
use crate::domain::OutgoingMessage;
use async_trait::async_trait;
use std::time::Duration;

/// Transport selected when no real transport is configured in testing mode.
///
/// Every send fails, so testing-mode messages are never reported as
/// delivered and the retry path is exercised without external services.
#[derive(Debug, Default, Clone, Copy)]
pub struct TestingMailTransport;

#[async_trait]
impl MailTransport for TestingMailTransport {
    async fn send(
        &self,
        message: &OutgoingMessage,
        _timeout: Duration,
    ) -> Result<(), TransportError> {
        tracing::debug!("Testing transport dropping message {:?}", message.subject);
        Err(TransportError::NotImplemented)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
