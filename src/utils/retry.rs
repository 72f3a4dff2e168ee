//! Retry utilities with exponential backoff for flaky lookups.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::sources::SourceError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Builder-style setter for the attempt bound
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Delay slept after the failed attempt `attempt` (0-based): `initial × multiplier^attempt`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Execute an async operation, retrying transient failures.
///
/// Errors for which [`SourceError::is_transient`] is false (a 404, a parse
/// failure) are returned immediately. Transient errors are retried until
/// `max_attempts` is reached, sleeping with exponential backoff in between;
/// the last error is returned once the bound is exhausted.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, mut operation: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(
                        "Operation succeeded on attempt {} after {} transient failures",
                        attempt + 1,
                        attempt
                    );
                }
                return Ok(result);
            }
            Err(error) if !error.is_transient() => return Err(error),
            Err(error) => {
                if attempt + 1 >= max_attempts {
                    tracing::warn!("Operation failed after {} attempts: {}", attempt + 1, error);
                    return Err(error);
                }

                let delay = config.delay_for_attempt(attempt);
                tracing::warn!(
                    "Transient error on attempt {}/{}: {}, retrying in {:?}",
                    attempt + 1,
                    max_attempts,
                    error,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
