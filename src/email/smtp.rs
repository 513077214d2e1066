//! SMTP mail transport implementation using a pooled lettre transport

use super::provider::{MailTransport, TransportError};
use crate::config::SmtpConfig;
use crate::domain::OutgoingMessage;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::{Tls, TlsParameters},
        PoolConfig,
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::time::Duration;
use tokio::sync::Semaphore;

/// SMTP-based mail transport backed by a connection pool.
///
/// At most `pool_size` sends run at once; callers beyond that limit wait for
/// a permit, and the wait counts against the attempt's timeout.
pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    permits: Semaphore,
    addr: String,
}

impl SmtpMailTransport {
    /// Create a new SMTP transport from configuration.
    ///
    /// `timeout` is applied to every network operation of the pooled
    /// connections. STARTTLS is used whenever the server offers it.
    pub fn from_config(config: &SmtpConfig, timeout: Duration) -> Result<Self, TransportError> {
        let tls = TlsParameters::new(config.host.clone())
            .map_err(|e| TransportError::InvalidConfiguration(e.to_string()))?;

        let pool = PoolConfig::new().max_size(u32::try_from(config.pool_size).unwrap_or(u32::MAX));

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .tls(Tls::Opportunistic(tls))
            .timeout(Some(timeout))
            .pool_config(pool);

        // Add credentials if provided
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));

            // lettre has no CRAM-MD5; LOGIN sends the password base64-encoded
            if config.use_cram_md5 {
                tracing::warn!(
                    "CRAM-MD5 is not supported, authenticating to {} with LOGIN instead",
                    config.addr()
                );
                builder = builder.authentication(vec![Mechanism::Login]);
            }
        }

        Ok(Self {
            transport: builder.build(),
            permits: Semaphore::new(config.pool_size.min(Semaphore::MAX_PERMITS)),
            addr: config.addr(),
        })
    }

    /// Build the MIME message with text and html alternatives
    fn build_message(message: &OutgoingMessage) -> Result<Message, TransportError> {
        if message.to.is_empty() {
            return Err(TransportError::InvalidMessage(
                "No recipients specified".to_string(),
            ));
        }

        let mut builder = Message::builder()
            .from(message.from.clone())
            .subject(&message.subject);

        for to in &message.to {
            builder = builder.to(to.clone());
        }

        builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(message.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(message.html_body.clone()),
                    ),
            )
            .map_err(|e| TransportError::InvalidMessage(e.to_string()))
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(
        &self,
        message: &OutgoingMessage,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        let email = Self::build_message(message)?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| TransportError::ConnectionError("connection pool closed".to_string()))?;

        match self.transport.send(email).await {
            Ok(response) => {
                tracing::debug!(
                    "SMTP server {} accepted message: {}",
                    self.addr,
                    response.message().collect::<Vec<_>>().join(" ")
                );
                Ok(())
            }
            Err(e) => {
                let error_msg = e.to_string();
                if e.is_timeout() {
                    Err(TransportError::Timeout(timeout))
                } else if error_msg.contains("authentication") || error_msg.contains("AUTH") {
                    Err(TransportError::AuthenticationFailed(error_msg))
                } else if error_msg.contains("connection") || error_msg.contains("pool") {
                    Err(TransportError::ConnectionError(error_msg))
                } else {
                    Err(TransportError::SendFailed(error_msg))
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}
