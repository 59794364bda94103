//! Shared retry policy - bounded attempts, exponential backoff with jitter
//!
//! Both the chain client and the notifier retry transient failures through
//! this one abstraction instead of carrying their own ad hoc sleep loops.
//! The caller supplies a predicate deciding which errors are worth retrying;
//! permanent errors are returned on the first attempt.

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first (minimum 1)
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each retry
    pub base_delay: Duration,
    /// Cap on the computed backoff delay
    pub max_delay: Duration,
    /// Additional random delay, as a fraction of the backoff (0.0 = none)
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            jitter_fraction: 0.25,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Self::default()
        }
    }

    /// Backoff delay after the given 1-based attempt number, jitter included.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        let capped = exp.min(self.max_delay);
        if self.jitter_fraction <= 0.0 || capped.is_zero() {
            return capped;
        }
        let jitter_cap = capped.mul_f64(self.jitter_fraction);
        let jitter = rand::thread_rng().gen_range(Duration::ZERO..=jitter_cap);
        capped + jitter
    }

    /// Run `op`, retrying while `is_retryable` holds and attempts remain.
    /// Returns the last error once attempts are exhausted or the error is
    /// permanent. `what` names the operation for log context.
    pub async fn run<T, E, F, Fut, P>(&self, what: &str, mut op: F, is_retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && is_retryable(&err) => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        operation = what,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "transient failure - retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
