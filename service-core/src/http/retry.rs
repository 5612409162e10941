//! Retry utilities for outbound REST calls.
//!
//! Only transport faults (connection failures, timeouts, broken request
//! streams) are retried. A response that made it back from the server is
//! never retried here, whatever its status: callers classify it themselves.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Configuration for retry behavior.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Multiplier applied to the exponential series, in seconds.
    pub backoff_multiplier: f64,
    /// Lower bound for a single backoff.
    pub min_backoff: Duration,
    /// Upper bound for a single backoff.
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_multiplier: 3.0,
            min_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Create a config with the given attempt ceiling and multiplier, keeping
    /// the default 1s..30s clamp.
    pub fn new(max_attempts: u32, backoff_multiplier: f64) -> Self {
        Self {
            max_attempts,
            backoff_multiplier,
            ..Default::default()
        }
    }

    /// Create a config with a single attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Backoff before retry number `retry` (0-based): `multiplier * 2^retry`
    /// seconds, clamped to `[min_backoff, max_backoff]`.
    pub fn backoff_duration(&self, retry: u32) -> Duration {
        let exp = 2f64.powi(retry.min(31) as i32);
        let secs = (self.backoff_multiplier * exp).max(0.0);
        let secs = secs
            .max(self.min_backoff.as_secs_f64())
            .min(self.max_backoff.as_secs_f64());

        Duration::from_secs_f64(secs)
    }
}

/// Errors that know whether they stem from a transient transport fault.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for reqwest::Error {
    fn is_transient(&self) -> bool {
        // Builder and redirect errors will fail identically on every attempt.
        if self.is_builder() || self.is_redirect() || self.is_status() {
            return false;
        }
        self.is_connect() || self.is_timeout() || self.is_request() || self.is_body()
    }
}

/// Execute an outbound call, retrying transient failures with exponential
/// backoff until `config.max_attempts` is reached.
///
/// # Example
/// ```ignore
/// let body = retry_http_call(&RetryConfig::default(), "list_groups", || async {
///     client.get(url.clone()).send().await?.text().await
/// })
/// .await?;
/// ```
pub async fn retry_http_call<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    f: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => {
                if attempt > 0 {
                    info!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        "HTTP call succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if !err.is_transient() {
                    warn!(
                        operation = operation_name,
                        error = %err,
                        "HTTP call failed with non-retryable error"
                    );
                    return Err(err);
                }

                if attempt + 1 >= max_attempts {
                    warn!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        error = %err,
                        "HTTP call failed after max attempts"
                    );
                    return Err(err);
                }

                let backoff = config.backoff_duration(attempt);
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    error = %err,
                    backoff_ms = backoff.as_millis() as u64,
                    "HTTP call failed, retrying after backoff"
                );
                metrics::counter!("registry_retries_total", "operation" => operation_name.to_string())
                    .increment(1);

                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}
