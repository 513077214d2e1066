//! SendGrid mail transport implementation
//!
//! Provides email sending via the SendGrid v3 `mail/send` HTTP API.

use super::provider::{MailTransport, TransportError};
use crate::config::SendGridConfig;
use crate::domain::OutgoingMessage;
use async_trait::async_trait;
use lettre::message::Mailbox;
use serde::Serialize;
use std::time::Duration;

const MAIL_SEND_PATH: &str = "/v3/mail/send";

/// SendGrid v3 mail/send request body
#[derive(Debug, Serialize, PartialEq)]
pub struct SendGridPayload {
    pub personalizations: Vec<Personalization>,
    pub from: SendGridAddress,
    pub subject: String,
    pub content: Vec<SendGridContent>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Personalization {
    pub to: Vec<SendGridAddress>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SendGridAddress {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<&Mailbox> for SendGridAddress {
    fn from(mailbox: &Mailbox) -> Self {
        Self {
            email: mailbox.email.to_string(),
            name: mailbox.name.clone().filter(|n| !n.is_empty()),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SendGridContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub value: String,
}

impl SendGridPayload {
    /// Build the request body for a rendered message
    pub fn from_message(message: &OutgoingMessage) -> Result<Self, TransportError> {
        if message.to.is_empty() {
            return Err(TransportError::InvalidMessage(
                "No recipients specified".to_string(),
            ));
        }

        Ok(Self {
            personalizations: vec![Personalization {
                to: message.to.iter().map(SendGridAddress::from).collect(),
            }],
            from: SendGridAddress::from(&message.from),
            subject: message.subject.clone(),
            content: vec![
                SendGridContent {
                    content_type: "text/plain".to_string(),
                    value: message.text_body.clone(),
                },
                SendGridContent {
                    content_type: "text/html".to_string(),
                    value: message.html_body.clone(),
                },
            ],
        })
    }
}

/// SendGrid mail transport
pub struct SendGridMailTransport {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl SendGridMailTransport {
    /// Create a new SendGrid transport from configuration
    pub fn from_config(config: &SendGridConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| TransportError::InvalidConfiguration(e.to_string()))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: format!("{}{}", config.base_url.trim_end_matches('/'), MAIL_SEND_PATH),
        })
    }
}

#[async_trait]
impl MailTransport for SendGridMailTransport {
    async fn send(
        &self,
        message: &OutgoingMessage,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        let payload = SendGridPayload::from_message(message)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(timeout)
                } else {
                    TransportError::ConnectionError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if !(200..=299).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected { status, body });
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "sendgrid"
    }
}
