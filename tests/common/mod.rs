//! Shared helpers for integration tests

use mailroom::config::{BackoffConfig, SendGridConfig};
use mailroom::{EmailConfig, TemplateSet};
use std::path::PathBuf;
use std::time::Duration;

pub const SENDER: &str = "Mailroom <noreply@example.com>";

pub fn fixture_templates() -> TemplateSet {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/templates");
    TemplateSet::from_dir(dir).expect("Failed to load fixture templates")
}

/// Short retry budget so failing sends finish quickly
pub fn fast_backoff() -> BackoffConfig {
    BackoffConfig {
        initial_interval: Duration::from_millis(10),
        max_interval: Duration::from_millis(40),
        max_elapsed_time: Duration::from_millis(400),
        timeout: Duration::from_millis(200),
    }
}

/// SendGrid configuration pointing at a mock server
pub fn sendgrid_config(base_url: &str) -> EmailConfig {
    EmailConfig {
        sender: SENDER.to_string(),
        sendgrid: SendGridConfig {
            api_key: "sg:fakeapikey".to_string(),
            base_url: base_url.to_string(),
        },
        backoff: fast_backoff(),
        ..Default::default()
    }
}
