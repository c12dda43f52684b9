//! Retry with exponential backoff.
//!
//! Shared between the transport collaborator (retries on idempotent
//! reads and idempotency-keyed enqueue calls, per the error-handling
//! design) and the Execution Tracker's polling drive mode (backoff
//! between queue-status polls).
//!
//! # Usage
//!
//! ```rust,ignore
//! use workflow_client_core::retry::{RetryPolicy, with_retry};
//!
//! let policy = RetryPolicy::default();
//! let result = with_retry(&policy, || async { some_fallible_call().await }).await;
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Configuration for retry behavior with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Initial delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each attempt.
    pub backoff_factor: f64,
    /// Random jitter range as a fraction (0.1 = +/-10%).
    pub jitter_percent: f64,
    /// Maximum number of attempts. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            jitter_percent: 0.1,
            max_attempts: Some(3),
        }
    }
}

impl RetryPolicy {
    /// Construct a policy, clamping factor/jitter into sane ranges.
    #[must_use]
    pub fn new(
        initial_delay: Duration,
        max_delay: Duration,
        backoff_factor: f64,
        jitter_percent: f64,
        max_attempts: Option<u32>,
    ) -> Self {
        Self {
            initial_delay,
            max_delay,
            backoff_factor: backoff_factor.max(1.0),
            jitter_percent: jitter_percent.clamp(0.0, 1.0),
            max_attempts,
        }
    }

    /// Policy for the execution tracker's polling mode, derived from the
    /// client's configured backoff bounds.
    #[must_use]
    pub fn polling(initial: Duration, max: Duration) -> Self {
        Self {
            initial_delay: initial,
            max_delay: max,
            backoff_factor: 2.0,
            jitter_percent: 0.2,
            max_attempts: None,
        }
    }

    /// Policy for transport-level retries on idempotent reads/enqueue.
    #[must_use]
    pub fn transport(max_attempts: u32) -> Self {
        Self {
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            jitter_percent: 0.1,
            max_attempts: Some(max_attempts),
        }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jitter = if self.jitter_percent > 0.0 {
            let mut rng = rand::thread_rng();
            let span = capped * self.jitter_percent;
            rng.gen_range(-span..=span)
        } else {
            0.0
        };
        Duration::from_secs_f64((capped + jitter).max(0.0))
    }
}

/// Run `op` until it succeeds, the policy's attempt budget is exhausted,
/// or `op` returns a non-retryable error.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => {
                let exhausted = policy
                    .max_attempts
                    .is_some_and(|max| attempt + 1 >= max);
                if exhausted {
                    warn!(attempt, "retry budget exhausted");
                    return Err(err);
                }
                let delay = policy.delay_for_attempt(attempt);
                debug!(attempt, ?delay, "retrying after error: {err}");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Compute the next polling delay given the previous one, clamped to the
/// policy's ceiling. Used by the Execution Tracker between status polls.
#[must_use]
pub fn next_poll_delay(policy: &RetryPolicy, previous: Duration) -> Duration {
    let next = previous.mul_f64(policy.backoff_factor);
    next.min(policy.max_delay).max(policy.initial_delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn with_retry_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(
            Duration::from_millis(1),
            Duration::from_millis(5),
            2.0,
            0.0,
            Some(5),
        );
        let result = with_retry(&policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Error::Transport("transient".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn with_retry_gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(
            Duration::from_millis(1),
            Duration::from_millis(2),
            2.0,
            0.0,
            Some(2),
        );
        let result: Result<()> =
            with_retry(&policy, || async { Err(Error::Transport("nope".into())) }).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn with_retry_does_not_retry_non_retryable_errors() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();
        let result: Result<()> = with_retry(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::UnknownInputIndex(0)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn next_poll_delay_respects_ceiling() {
        let policy = RetryPolicy::polling(Duration::from_millis(500), Duration::from_secs(5));
        let mut delay = policy.initial_delay;
        for _ in 0..10 {
            delay = next_poll_delay(&policy, delay);
        }
        assert!(delay <= policy.max_delay);
    }
}
