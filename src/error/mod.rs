//! Unified error handling for Mailroom

use crate::email::TransportError;
use thiserror::Error;

/// Library-wide result type
pub type Result<T> = std::result::Result<T, MailError>;

/// Invalid email configuration, detected when the mailer is initialized
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration: sender email is required")]
    MissingSender,

    #[error("invalid configuration: could not parse sender email address")]
    InvalidSender,

    #[error("invalid configuration: cannot specify configuration for both smtp and sendgrid")]
    Conflict,

    #[error("invalid configuration: smtp port is required")]
    MissingPort,

    #[error("invalid configuration: smtp connections pool size must be greater than zero")]
    PoolSize,

    #[error("invalid configuration: smtp cram-md5 requires username and password")]
    CramMd5Auth,

    #[error("invalid configuration: initial interval must be greater than zero")]
    InitialInterval,

    #[error("invalid configuration: max interval must be greater than zero")]
    MaxInterval,

    #[error("invalid configuration: max elapsed time must be greater than zero")]
    MaxElapsedTime,

    #[error("invalid configuration: timeout must be greater than zero")]
    Timeout,
}

/// Mail error types
#[derive(Error, Debug)]
pub enum MailError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("missing email sender")]
    MissingSender,

    #[error("missing email recipient(s)")]
    MissingRecipient,

    #[error("missing email subject")]
    MissingSubject,

    #[error("missing email template name")]
    MissingTemplate,

    #[error("could not parse email address: {0}")]
    IncorrectEmail(String),

    #[error("email sending method has not been configured")]
    NotInitialized,

    #[error("templates have not been loaded yet")]
    TemplatesNotLoaded,

    #[error("could not find {0:?} in templates")]
    TemplateNotFound(String),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("no email transport could be selected from the configuration")]
    NoTransport,

    #[error("email delivery failed: {0}")]
    Transport(#[from] TransportError),

    #[error("email delivery cancelled")]
    Cancelled,
}

impl MailError {
    /// Whether the error was produced while validating the message itself
    pub fn is_message_error(&self) -> bool {
        matches!(
            self,
            Self::MissingSender
                | Self::MissingRecipient
                | Self::MissingSubject
                | Self::MissingTemplate
                | Self::IncorrectEmail(_)
        )
    }
}
