//! Domain types for Mailroom

pub mod email;

pub use email::{parse_address, parse_addresses, Email, OutgoingMessage};
