//! Exponential backoff policy and the cancellable retry loop around delivery attempts

use crate::config::BackoffConfig;
use crate::email::TransportError;
use crate::error::{MailError, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Growth factor applied to the interval after every failed attempt
pub const MULTIPLIER: f64 = 2.0;

/// Delays are drawn uniformly from `interval * (1 ± RANDOMIZATION_FACTOR)`
pub const RANDOMIZATION_FACTOR: f64 = 0.45;

/// Jittered exponential backoff schedule
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    max_interval: Duration,
    multiplier: f64,
    randomization_factor: f64,
    current_interval: Duration,
}

impl ExponentialBackoff {
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            initial_interval: config.initial_interval,
            max_interval: config.max_interval,
            multiplier: MULTIPLIER,
            randomization_factor: RANDOMIZATION_FACTOR,
            current_interval: config.initial_interval,
        }
    }

    /// Interval the next delay is drawn around
    pub fn current_interval(&self) -> Duration {
        self.current_interval
    }

    pub fn reset(&mut self) {
        self.current_interval = self.initial_interval;
    }

    /// Draw the next delay and grow the interval, capped at the max interval
    pub fn next_delay<R: Rng>(&mut self, rng: &mut R) -> Duration {
        let delay = randomize(self.current_interval, self.randomization_factor, rng.gen());

        let grown = self.current_interval.as_secs_f64() * self.multiplier;
        self.current_interval = if grown >= self.max_interval.as_secs_f64() {
            self.max_interval
        } else {
            Duration::from_secs_f64(grown)
        };

        delay
    }
}

/// Map `random` in [0, 1) onto [interval * (1 - factor), interval * (1 + factor)]
fn randomize(interval: Duration, factor: f64, random: f64) -> Duration {
    let interval = interval.as_secs_f64();
    let delta = factor * interval;
    let min = interval - delta;
    let max = interval + delta;
    Duration::from_secs_f64((min + random * (max - min)).max(0.0))
}

/// Run `attempt` until it succeeds, the elapsed-time budget is spent, or
/// `cancel` fires.
///
/// The first attempt runs immediately. Each attempt is bounded by
/// `config.timeout` (a zero timeout leaves attempts unbounded). When the next
/// delay would cross `config.max_elapsed_time` the last transport error is
/// returned. Cancellation wins over everything else and yields
/// [`MailError::Cancelled`].
pub async fn retry<T, F, Fut>(
    config: &BackoffConfig,
    cancel: &CancellationToken,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, TransportError>>,
{
    let start = Instant::now();
    let mut backoff = ExponentialBackoff::new(config);
    let mut number: u32 = 0;

    loop {
        number += 1;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MailError::Cancelled),
            outcome = bounded(attempt(number), config.timeout) => outcome,
        };

        let err = match outcome {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let delay = backoff.next_delay(&mut rand::thread_rng());
        let elapsed = start.elapsed();
        if elapsed + delay > config.max_elapsed_time {
            tracing::error!(
                "Giving up after {} attempt(s) in {:?}: {}",
                number,
                elapsed,
                err
            );
            return Err(err.into());
        }

        tracing::warn!(
            "Delivery attempt {} failed, retrying in {:?}: {}",
            number,
            delay,
            err
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MailError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

async fn bounded<T, Fut>(attempt: Fut, timeout: Duration) -> std::result::Result<T, TransportError>
where
    Fut: Future<Output = std::result::Result<T, TransportError>>,
{
    if timeout.is_zero() {
        return attempt.await;
    }

    match tokio::time::timeout(timeout, attempt).await {
        Ok(outcome) => outcome,
        Err(_) => Err(TransportError::Timeout(timeout)),
    }
}
