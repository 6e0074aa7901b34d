//! Retry logic with exponential backoff for rate limiting and transient errors.
//!
//! One combinator serves every call. The operation reports a 429 as
//! [`Attempt::RateLimited`] (with the server's `Retry-After`, if any) and
//! connection failures as retryable errors; everything else ends the loop.

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::types::RetryConfig;
use log::warn;
use std::time::Duration;

/// Outcome of a single attempt that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    /// The attempt produced a final value.
    Done(T),
    /// The server answered 429.
    RateLimited {
        /// Server-requested wait, when supplied and parseable.
        retry_after: Option<Duration>,
    },
}

/// Callback trait for retry progress notifications.
pub trait RetryCallback {
    /// Called before waiting for the next attempt.
    ///
    /// # Arguments
    /// * `attempt` - The attempt that just failed (1-indexed)
    /// * `max_attempts` - Maximum number of attempts
    /// * `error` - Why the attempt failed
    /// * `delay` - Time until the next attempt
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay: Duration);
}

/// No-op callback that does nothing.
pub struct NoCallback;

impl RetryCallback for NoCallback {
    fn on_retry(&self, _attempt: u32, _max_attempts: u32, _error: &Error, _delay: Duration) {}
}

/// Parse a `Retry-After` header given in whole seconds.
///
/// Missing, non-numeric, and zero values yield `None` so the caller falls
/// back to exponential backoff.
#[must_use]
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// Execute an operation with retry logic.
///
/// The operation receives the 1-indexed attempt number. Rate-limited and
/// network outcomes are retried up to `config.max_retries` times; every wait
/// is interruptible through `cancel`, and cancellation is never retried.
///
/// # Returns
/// The operation's value, the first non-retryable error, or
/// [`Error::RateLimited`] / [`Error::Network`] carrying the total attempt count
/// once the budget is spent.
pub fn with_retry<T, F>(
    config: &RetryConfig,
    cancel: &CancelToken,
    callback: Option<&dyn RetryCallback>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(u32) -> Result<Attempt<T>>,
{
    let max_attempts = config.max_attempts();

    for attempt in 0..max_attempts {
        cancel.check()?;
        let attempts = attempt + 1;
        let last = attempts >= max_attempts;

        let (delay, cause) = match operation(attempts) {
            Ok(Attempt::Done(value)) => return Ok(value),
            Ok(Attempt::RateLimited { retry_after }) => {
                let delay =
                    config.clamp(retry_after.unwrap_or_else(|| config.delay_for_attempt(attempt)));
                let err = Error::RateLimited {
                    attempts,
                    last_wait: delay,
                };
                if last {
                    warn!("Rate limit persisted after {attempts} attempts, giving up");
                    return Err(err);
                }
                (delay, err)
            }
            Err(err) if err.is_cancelled() || !err.is_retryable() => return Err(err),
            Err(err) => {
                let message = match err {
                    Error::Network { message, .. } => message,
                    other => other.to_string(),
                };
                let err = Error::Network { attempts, message };
                if last {
                    warn!("Giving up after {attempts} attempts: {err}");
                    return Err(err);
                }
                (config.delay_for_attempt(attempt), err)
            }
        };

        warn!(
            "Attempt {attempts}/{max_attempts} failed ({}), retrying in {:.1}s",
            cause.category(),
            delay.as_secs_f64()
        );
        if let Some(cb) = callback {
            cb.on_retry(attempts, max_attempts, &cause, delay);
        }
        cancel.sleep(delay)?;
    }

    Err(Error::Network {
        attempts: max_attempts,
        message: "retry budget exhausted".to_string(),
    })
}
