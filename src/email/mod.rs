//! Email transports and templates for Mailroom
//!
//! This module provides delivery through interchangeable transports:
//! - SMTP (pooled lettre transport)
//! - SendGrid (v3 HTTP API)
//! - Testing (selected in testing mode, never delivers)

pub mod provider;
pub mod sendgrid;
pub mod smtp;
pub mod templates;
pub mod testing;

pub use provider::{MailTransport, TransportError};
pub use sendgrid::SendGridMailTransport;
pub use smtp::SmtpMailTransport;
pub use templates::{RenderedEmail, TemplateSet};
pub use testing::TestingMailTransport;
