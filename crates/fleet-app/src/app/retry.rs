//! Bounded, retried execution of blocking store calls

use std::sync::Arc;
use std::time::Duration;

use fleet_types::{Error, Result};

/// How store operations are bounded and retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first failure; doubled after each further one, up to 64x
    pub initial_backoff: Duration,
    /// Upper bound on a single attempt
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(6);
        self.initial_backoff.saturating_mul(1u32 << exponent)
    }
}

/// An operation that gave up
#[derive(Debug)]
pub struct RetryFailure {
    pub error: Error,
    pub attempts: u32,
}

impl std::fmt::Display for RetryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (after {} attempts)", self.error, self.attempts)
    }
}

/// Run a blocking store operation on the blocking pool, bounded by the policy
/// timeout and retried with exponential backoff while the error is retryable.
///
/// Returns the value and the number of attempts it took. A timed-out attempt
/// keeps running in the background, so the operation must be safe to repeat.
pub async fn run_blocking<T, F>(
    policy: &RetryPolicy,
    what: &str,
    op: F,
) -> std::result::Result<(T, u32), RetryFailure>
where
    F: Fn() -> Result<T> + Send + Sync + 'static,
    T: Send + 'static,
{
    let op = Arc::new(op);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let call = Arc::clone(&op);
        let outcome = match tokio::time::timeout(
            policy.timeout,
            tokio::task::spawn_blocking(move || call()),
        )
        .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(Error::Pipeline(format!("{} task failed: {}", what, join_error))),
            Err(_) => Err(Error::Timeout(format!("{} exceeded {:?}", what, policy.timeout))),
        };

        match outcome {
            Ok(value) => return Ok((value, attempt)),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.backoff_for(attempt);
                log::warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    what,
                    attempt,
                    policy.max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(error) => {
                return Err(RetryFailure {
                    error,
                    attempts: attempt,
                })
            }
        }
    }
}
