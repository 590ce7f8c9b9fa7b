//! Retry policy for API calls.
//!
//! # Retry Policy
//!
//! - Max attempts: 3 (initial call plus 2 retries)
//! - Fixed wait: 2 seconds
//! - Jitter: up-jitter up to 1 second (added to the fixed wait)
//!
//! # Retryable Conditions
//!
//! - Transport errors (no response received)
//! - HTTP 429; waits exactly `Retry-After` when the server sends it
//! - HTTP 3xx and 5xx
//!
//! 4xx responses other than 429, and bodies that fail to decode, are
//! returned immediately.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use tokio::time::sleep;

use crate::RequestError;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, counting the first call. Zero is treated
    /// as one.
    pub max_attempts: u32,
    /// Base delay between attempts when the server gives no hint.
    pub fixed_wait: Duration,
    /// Upper bound of the random delay added to `fixed_wait`.
    pub max_jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            fixed_wait: Duration::from_secs(2),
            max_jitter: Duration::from_secs(1),
        }
    }
}

/// Parse the `Retry-After` header as a (possibly fractional) number of
/// seconds.
///
/// Returns `None` if the header is missing, not a number, negative, or not
/// finite.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let secs = raw.trim().parse::<f64>().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}

/// Delay before the next attempt after `error`.
#[must_use]
pub fn calculate_retry_delay(error: &RequestError, config: &RetryConfig) -> Duration {
    if let Some(delay) = error.retry_after() {
        return delay;
    }

    let jitter = config.max_jitter.mul_f64(rand::random::<f64>());
    config.fixed_wait + jitter
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// `config.max_attempts` attempts have been made.
///
/// The error from the last attempt is returned when attempts run out.
pub async fn retry_api_calls<T, F, Fut>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !error.is_retryable() || attempt >= max_attempts {
            return Err(error);
        }

        let delay = calculate_retry_delay(&error, config);
        if matches!(error, RequestError::RateLimitExceeded { .. }) {
            tracing::warn!(
                url = error.url(),
                attempt,
                delay_ms = delay.as_millis(),
                "Rate limit exceeded; waiting before retrying"
            );
        } else {
            tracing::debug!(
                error = %error,
                attempt,
                delay_ms = delay.as_millis(),
                "Retrying request after error"
            );
        }

        sleep(delay).await;
        attempt += 1;
    }
}
