//! Mail delivery service
//!
//! A [`Mailer`] is built once from a validated configuration and holds the
//! transport chosen at that point. It is `Send + Sync`; share it behind an
//! `Arc` and call [`Mailer::send`] from as many tasks as needed. It is never
//! reinitialized; build a new one instead.

use crate::config::EmailConfig;
use crate::domain::{Email, OutgoingMessage};
use crate::email::{
    MailTransport, RenderedEmail, SendGridMailTransport, SmtpMailTransport, TemplateSet,
    TestingMailTransport,
};
use crate::error::{MailError, Result};
use crate::service::backoff;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Service for rendering and sending emails
pub struct Mailer {
    config: EmailConfig,
    templates: Option<TemplateSet>,
    transport: Option<Arc<dyn MailTransport>>,
}

impl Mailer {
    /// A mailer with no transport; every send fails with `NotInitialized`
    pub fn disabled() -> Self {
        Self {
            config: EmailConfig::default(),
            templates: None,
            transport: None,
        }
    }

    /// Validate `config` and set up the transport it selects.
    ///
    /// When no transport is configured and testing is off, email support is
    /// optional: no error is returned and the mailer stays disabled.
    pub async fn initialize(config: EmailConfig, templates: Option<TemplateSet>) -> Result<Self> {
        if !config.available() && !config.testing {
            tracing::info!("No email transport configured, email sending is disabled");
            return Ok(Self {
                config,
                templates,
                transport: None,
            });
        }

        config.validate()?;

        let transport: Arc<dyn MailTransport> = if config.smtp.enabled() {
            Arc::new(SmtpMailTransport::from_config(
                &config.smtp,
                config.backoff.timeout,
            )?)
        } else if config.sendgrid.enabled() {
            Arc::new(SendGridMailTransport::from_config(&config.sendgrid)?)
        } else if config.testing {
            Arc::new(TestingMailTransport)
        } else {
            return Err(MailError::NoTransport);
        };

        tracing::info!("Email sending initialized with {} transport", transport.name());

        Ok(Self {
            config,
            templates,
            transport: Some(transport),
        })
    }

    /// Build a mailer around an already constructed transport
    pub fn with_transport(
        config: EmailConfig,
        templates: Option<TemplateSet>,
        transport: Arc<dyn MailTransport>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            templates,
            transport: Some(transport),
        })
    }

    /// Replace the loaded templates
    pub fn with_templates(mut self, templates: TemplateSet) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn config(&self) -> &EmailConfig {
        &self.config
    }

    /// Whether a transport was set up
    pub fn is_initialized(&self) -> bool {
        self.transport.is_some()
    }

    /// Get the active transport name
    pub fn transport_name(&self) -> Option<&'static str> {
        self.transport.as_ref().map(|t| t.name())
    }

    /// Render the text and html variants of `name` (given without extension)
    pub fn render(&self, name: &str, data: &Value) -> Result<RenderedEmail> {
        self.templates
            .as_ref()
            .ok_or(MailError::TemplatesNotLoaded)?
            .render_email(name, data)
    }

    /// Create an email to `recipient` from the configured sender
    pub fn compose(
        &self,
        recipient: impl Into<String>,
        subject: impl Into<String>,
        template: impl Into<String>,
        data: Value,
    ) -> Result<Email> {
        Email::from_config(&self.config, recipient, subject, template, data)
    }

    /// Send an email, retrying with exponential backoff on transport failures
    pub async fn send(&self, email: &Email) -> Result<()> {
        self.send_with_cancel(email, &CancellationToken::new()).await
    }

    /// Send an email; cancelling `cancel` aborts any pending attempt or delay
    pub async fn send_with_cancel(&self, email: &Email, cancel: &CancellationToken) -> Result<()> {
        let transport = self.transport.as_ref().ok_or(MailError::NotInitialized)?;

        email.validate()?;
        let rendered = self.render(&email.template, &email.data)?;
        let message = OutgoingMessage::new(email, rendered.text_body, rendered.html_body)?;

        let name = transport.name();
        let timeout = self.config.backoff.timeout;
        let transport: &dyn MailTransport = transport.as_ref();
        let message = &message;
        let start = Instant::now();

        let result = backoff::retry(&self.config.backoff, cancel, move |attempt| {
            tracing::debug!("Sending {:?} via {} (attempt {})", email.subject, name, attempt);
            metrics::counter!("mailroom_send_attempts_total", "transport" => name).increment(1);
            async move {
                let outcome = transport.send(message, timeout).await;
                if outcome.is_err() {
                    metrics::counter!("mailroom_send_failures_total", "transport" => name)
                        .increment(1);
                }
                outcome
            }
        })
        .await;

        let outcome = match &result {
            Ok(()) => "delivered",
            Err(MailError::Cancelled) => "cancelled",
            Err(_) => "failed",
        };
        metrics::counter!("mailroom_sends_total", "transport" => name, "outcome" => outcome)
            .increment(1);
        metrics::histogram!("mailroom_send_duration_seconds", "transport" => name)
            .record(start.elapsed().as_secs_f64());

        match &result {
            Ok(()) => tracing::debug!("Delivered {:?} to {:?} via {}", email.subject, email.to, name),
            Err(e) => tracing::warn!("Could not deliver {:?} via {}: {}", email.subject, name, e),
        }

        result
    }
}

impl fmt::Debug for Mailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailer")
            .field("transport", &self.transport_name())
            .field("templates_loaded", &self.templates.is_some())
            .field("testing", &self.config.testing)
            .finish()
    }
}
