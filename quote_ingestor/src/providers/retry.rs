//! Exponential backoff with jitter for retryable provider failures.

use std::{future::Future, time::Duration};

use rand::Rng;
use shared_utils::event_log::EventLog;

use crate::providers::ProviderError;

/// How often and how patiently a request is retried.
///
/// The delay before retry `n` (0-based) is `base_delay * 2^n + uniform(0, jitter)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry, doubled each time.
    pub base_delay: Duration,
    /// Upper bound of the random extra delay.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts. Handy in tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (0-based), using `rng` for the jitter.
    pub fn delay_for<R: Rng + ?Sized>(&self, retry: u32, rng: &mut R) -> Duration {
        let backoff = self.base_delay.saturating_mul(2u32.saturating_pow(retry));
        let jitter = if self.jitter.is_zero() {
            Duration::ZERO
        } else {
            self.jitter.mul_f64(rng.random_range(0.0..1.0))
        };
        backoff.saturating_add(jitter)
    }

    /// Run `attempt` until it succeeds, fails with a non-retryable error, or
    /// the retry budget is spent. The last error is returned in the latter case.
    ///
    /// `attempt` receives the 0-based attempt number.
    pub async fn run<T, F, Fut>(
        &self,
        log: &dyn EventLog,
        label: &str,
        mut attempt: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let attempts = self.max_retries + 1;
        let mut n = 0;
        loop {
            let err = match attempt(n).await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => {
                    log.error(&format!("{label}: {err}"));
                    return Err(err);
                }
                Err(err) => err,
            };

            log.warn(&format!("{label}: attempt {}/{attempts} failed: {err}", n + 1));
            if n >= self.max_retries {
                log.error(&format!("{label}: all {attempts} attempts failed"));
                return Err(err);
            }

            let delay = self.delay_for(n, &mut rand::rng());
            if !delay.is_zero() {
                log.info(&format!("{label}: retrying in {:.2}s", delay.as_secs_f64()));
                tokio::time::sleep(delay).await;
            }
            n += 1;
        }
    }
}
