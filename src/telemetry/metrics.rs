//! Metric definitions
//!
//! Metrics go through the `metrics` facade; the embedding application
//! decides which recorder (if any) to install.

use metrics::{counter, describe_counter, describe_histogram};

/// Register metric descriptions and emit initial zero counter values so
/// exporters list every counter from startup.
pub fn describe_metrics() {
    describe_counter!(
        "mailroom_send_attempts_total",
        "Total number of delivery attempts, including retries"
    );
    describe_counter!(
        "mailroom_send_failures_total",
        "Total number of failed delivery attempts"
    );
    describe_counter!(
        "mailroom_sends_total",
        "Total number of send calls by final outcome"
    );
    describe_histogram!(
        "mailroom_send_duration_seconds",
        "Send duration in seconds, including backoff delays"
    );

    for transport in ["smtp", "sendgrid", "mock"] {
        counter!("mailroom_send_attempts_total", "transport" => transport).absolute(0);
        counter!("mailroom_send_failures_total", "transport" => transport).absolute(0);
        counter!("mailroom_sends_total", "transport" => transport, "outcome" => "delivered")
            .absolute(0);
    }
}
