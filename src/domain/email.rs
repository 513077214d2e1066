//! Email message domain types

use crate::config::EmailConfig;
use crate::error::{MailError, Result};
use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parse a single address, optionally prefixed by a display name (`Name <addr>`)
pub fn parse_address(address: &str) -> Result<Mailbox> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| MailError::IncorrectEmail(format!("{}: {}", address, e)))
}

/// Parse a list of addresses, failing on the first one that does not parse
pub fn parse_addresses(addresses: &[String]) -> Result<Vec<Mailbox>> {
    addresses.iter().map(|a| parse_address(a)).collect()
}

/// Email send request
///
/// `template` is the template name without extension; both `<template>.txt`
/// and `<template>.html` are rendered with `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    pub sender: String,
    pub to: Vec<String>,
    pub subject: String,
    pub template: String,
    #[serde(default)]
    pub data: Value,
}

impl Email {
    /// Create a validated email
    pub fn new<I, S>(
        sender: impl Into<String>,
        to: I,
        subject: impl Into<String>,
        template: impl Into<String>,
        data: Value,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let email = Self {
            sender: sender.into(),
            to: to.into_iter().map(Into::into).collect(),
            subject: subject.into(),
            template: template.into(),
            data,
        };
        email.validate()?;
        Ok(email)
    }

    /// Create a validated email to a single recipient, sent from the configured sender
    pub fn from_config(
        config: &EmailConfig,
        recipient: impl Into<String>,
        subject: impl Into<String>,
        template: impl Into<String>,
        data: Value,
    ) -> Result<Self> {
        Self::new(config.from_address(), [recipient], subject, template, data)
    }

    /// Check required fields and address syntax.
    ///
    /// Missing fields are reported in the order sender, recipient, subject,
    /// template; address syntax is only checked once all fields are present.
    pub fn validate(&self) -> Result<()> {
        if self.sender.trim().is_empty() {
            return Err(MailError::MissingSender);
        }

        if self.to.is_empty() {
            return Err(MailError::MissingRecipient);
        }

        if self.subject.trim().is_empty() {
            return Err(MailError::MissingSubject);
        }

        if self.template.trim().is_empty() {
            return Err(MailError::MissingTemplate);
        }

        parse_address(&self.sender)?;
        parse_addresses(&self.to)?;
        Ok(())
    }
}

/// Fully rendered message handed to a transport
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub from: Mailbox,
    pub to: Vec<Mailbox>,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

impl OutgoingMessage {
    /// Resolve the addresses of `email` and attach its rendered bodies
    pub fn new(email: &Email, text_body: String, html_body: String) -> Result<Self> {
        let to = parse_addresses(&email.to)?;
        if to.is_empty() {
            return Err(MailError::MissingRecipient);
        }

        Ok(Self {
            from: parse_address(&email.sender)?,
            to,
            subject: email.subject.clone(),
            text_body,
            html_body,
        })
    }
}
