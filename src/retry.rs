//! Request gateway: retry logic with exponential backoff and cancellation
//!
//! This module wraps a single remote call with configurable retry behavior.
//! It implements exponential backoff with optional jitter, and observes a
//! cancellation token so that in-flight calls and queued retries abandon
//! immediately when the owning task is cancelled.
//!
//! # Example
//!
//! ```no_run
//! use batch_export::retry::{IsRetryable, request_with_retry};
//! use batch_export::config::RetryConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//! # impl std::fmt::Display for MyError {
//! #     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//! #         write!(f, "{self:?}")
//! #     }
//! # }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RetryConfig::default();
//! let cancel = CancellationToken::new();
//! let result = request_with_retry(&config, &cancel, || async {
//!     // Your remote call here
//!     Ok::<_, MyError>(())
//! }).await;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::FetchError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network timeouts, server busy, rate limiting) should
/// return `true`. Permanent failures (item not found, malformed response)
/// should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

/// Implementation of IsRetryable for remote fetch failures
impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout(_) => true,
            FetchError::RateLimited => true,
            // Server-side errors are worth retrying; client errors are not
            FetchError::Status { code } => *code >= 500,
            FetchError::NotFound { .. } => false,
            // Transport errors: retry timeouts and connect failures
            FetchError::Network(e) => e.is_timeout() || e.is_connect(),
            FetchError::Malformed(_) => false,
        }
    }
}

/// Outcome of a gateway call other than success
///
/// Distinguishes cancellation (a normal terminal outcome) from terminal
/// failure (non-retryable error, or the retry budget exhausted).
#[derive(Debug)]
pub enum GatewayError<E> {
    /// The owning task was cancelled before the call could complete
    Cancelled,
    /// The call failed permanently
    Failed(E),
}

impl<E> GatewayError<E> {
    /// Returns true for the cancellation outcome
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatewayError::Cancelled)
    }

    /// Extract the terminal failure, if any
    pub fn into_failed(self) -> Option<E> {
        match self {
            GatewayError::Cancelled => None,
            GatewayError::Failed(e) => Some(e),
        }
    }
}

impl<E: std::fmt::Display> std::fmt::Display for GatewayError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Cancelled => write!(f, "request cancelled"),
            GatewayError::Failed(e) => write!(f, "{e}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for GatewayError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::Cancelled => None,
            GatewayError::Failed(e) => Some(e),
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// # Arguments
///
/// * `config` - Retry configuration (max attempts, delays, backoff multiplier, jitter)
/// * `cancel` - Cancellation token of the owning task; observed before each
///   attempt, during the in-flight call, and during backoff waits
/// * `operation` - Async closure returning `Result<T, E>` where E implements IsRetryable
///
/// # Returns
///
/// The successful result, `GatewayError::Cancelled` if the token fired, or
/// `GatewayError::Failed` carrying the last error once retries are exhausted
/// or the error is classified permanent.
pub async fn request_with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, GatewayError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        if cancel.is_cancelled() {
            tracing::debug!("request abandoned: task cancelled");
            return Err(GatewayError::Cancelled);
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("in-flight request abandoned: task cancelled");
                return Err(GatewayError::Cancelled);
            }
            result = operation() => result,
        };

        match result {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "request succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "request failed, retrying"
                );

                let jittered_delay = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                // Wait before retrying, abandoning the wait on cancellation
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("retry wait abandoned: task cancelled");
                        return Err(GatewayError::Cancelled);
                    }
                    _ = tokio::time::sleep(jittered_delay) => {}
                }

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "request failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(
                        error = %e,
                        "request failed with non-retryable error"
                    );
                }
                return Err(GatewayError::Failed(e));
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// actual delay falls between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
