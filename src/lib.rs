//! Mailroom - templated transactional email
//!
//! This crate renders templated emails and delivers them through either a
//! pooled SMTP connection or the SendGrid HTTP API, retrying failed attempts
//! with jittered exponential backoff.

pub mod config;
pub mod domain;
pub mod email;
pub mod error;
pub mod service;
pub mod telemetry;

// Re-export commonly used types
pub use config::EmailConfig;
pub use domain::Email;
pub use email::TemplateSet;
pub use error::{ConfigError, MailError, Result};
pub use service::Mailer;
