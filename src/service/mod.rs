//! Delivery services

pub mod backoff;
pub mod mailer;

pub use backoff::{retry, ExponentialBackoff};
pub use mailer::Mailer;
