//! Exponential backoff around a single remote call.
//!
//! Only rate-limit failures are retried. Every retry re-issues the whole
//! request after a delay of `min(initial * 2^attempt, max)`.

use crate::config::RetryConfig;
use crate::error::PromptError;
use crate::llm::client::RequestError;
use log::{error, warn};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1` (attempt is 0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Runs `operation` until it succeeds, fails with something other than a
/// rate limit, or the retry budget is spent.
///
/// `on_retry(attempt, delay)` fires before each wait with the 1-based retry number.
pub async fn retry_with_backoff<T, F, Fut, R>(
    policy: &RetryPolicy,
    mut operation: F,
    mut on_retry: R,
) -> Result<T, PromptError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
    R: FnMut(u32, Duration),
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_rate_limit() => {
                if attempt >= policy.max_retries {
                    error!("Rate limit persisted after {} retries: {}", attempt, err);
                    return Err(PromptError::RateLimit {
                        attempts: attempt,
                        max_retries: policy.max_retries,
                        message: err.to_string(),
                    });
                }

                let delay = policy.delay_for_attempt(attempt);
                attempt += 1;
                warn!(
                    "Rate limit hit. Retrying in {}ms (attempt {}/{})",
                    delay.as_millis(),
                    attempt,
                    policy.max_retries
                );
                on_retry(attempt, delay);
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                error!("Error improving prompt: {}", err);
                return Err(PromptError::Remote(err.to_string()));
            }
        }
    }
}
