//! Bounded exponential backoff for collaborator calls.
//!
//! # Design
//! - Only errors that report themselves transient are retried.
//! - Every call ends in exactly one success or one returned error.
//! - Delays double per attempt (capped at five doublings) and never exceed `max_delay`.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{LogError, StoreError};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(200);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);
const MAX_DOUBLINGS: u32 = 5;

/// Errors that can tell whether a retry is worthwhile.
pub trait Retryable {
    /// `true` when the same call may succeed if repeated.
    fn is_transient(&self) -> bool;
}

impl Retryable for StoreError {
    fn is_transient(&self) -> bool {
        Self::is_transient(self)
    }
}

impl Retryable for LogError {
    fn is_transient(&self) -> bool {
        Self::is_transient(self)
    }
}

/// Retry budget applied to each collaborator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; values below one are treated as one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Retry without sleeping between attempts.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after the given zero-based failed attempt.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let capped = attempt.min(MAX_DOUBLINGS);
        self.base_delay
            .saturating_mul(2u32.saturating_pow(capped))
            .min(self.max_delay)
    }

    /// Drive `call` until it succeeds, fails permanently, or the budget is spent.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `call`.
    pub async fn run<T, E, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < attempts && err.is_transient() => {
                    let delay = self.delay_for(attempt - 1);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient collaborator failure; retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn unavailable() -> StoreError {
        StoreError::Unavailable {
            operation: "put_object",
            source: Box::new(io::Error::other("connection reset")),
        }
    }

    #[test]
    fn delay_doubles_and_clamps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for(10), Duration::from_secs(2));
        assert_eq!(RetryPolicy::none().delay_for(4), Duration::ZERO);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() -> anyhow::Result<()> {
        let calls = AtomicU32::new(0);
        let value = RetryPolicy::immediate(3)
            .run("put_object", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(unavailable())
                } else {
                    Ok(7_u32)
                }
            })
            .await?;
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn permanent_failures_stop_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), StoreError> = RetryPolicy::immediate(5)
            .run("put_object", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Rejected {
                    operation: "put_object",
                    reason: "denied".into(),
                })
            })
            .await;
        assert!(matches!(result, Err(StoreError::Rejected { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_budget_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), StoreError> = RetryPolicy::immediate(2)
            .run("put_object", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(unavailable())
            })
            .await;
        assert!(matches!(result, Err(StoreError::Unavailable { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stale_token_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), LogError> = RetryPolicy::immediate(4)
            .run("put_events", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LogError::InvalidSequenceToken {
                    stream: "InstrumentUploads".into(),
                    expected: None,
                })
            })
            .await;
        assert!(matches!(result, Err(LogError::InvalidSequenceToken { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
