//! Bounded retry with exponential backoff for remote calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use quire_core::{defaults, Error, Result};

/// Outcome of a single failed attempt.
#[derive(Debug)]
pub struct AttemptFailure {
    pub error: Error,
    /// Whether another attempt may succeed.
    pub retryable: bool,
}

impl AttemptFailure {
    pub fn retryable(error: Error) -> Self {
        Self {
            error,
            retryable: true,
        }
    }

    pub fn fatal(error: Error) -> Self {
        Self {
            error,
            retryable: false,
        }
    }
}

/// Retry policy for one remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each further attempt.
    pub base_delay: Duration,
    /// Upper bound on a single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::REMOTE_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(defaults::REMOTE_RETRY_BASE_MS),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Backoff before attempt `attempt + 1`, without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn jittered(&self, attempt: u32) -> Duration {
        let backoff = self.backoff(attempt);
        let spread = (backoff.as_millis() as u64) / 4;
        if spread == 0 {
            return backoff;
        }
        let jitter = rand::thread_rng().gen_range(0..=spread);
        backoff + Duration::from_millis(jitter)
    }

    /// Run `op` until it succeeds, fails fatally, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = std::result::Result<T, AttemptFailure>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(failure) if failure.retryable && attempt < max_attempts => {
                    let delay = self.jittered(attempt);
                    warn!(
                        subsystem = "inference",
                        op = operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure.error,
                        "Remote call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(failure) => return Err(failure.error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(attempts: u32) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(attempts)
            .with_base_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(500));
        assert_eq!(policy.backoff(40), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = fast(3)
            .run("test", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(AttemptFailure::retryable(Error::Request("reset".into())))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = fast(2)
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AttemptFailure::retryable(Error::Embedding("503".into()))) }
            })
            .await;
        assert!(matches!(result, Err(Error::Embedding(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fatal_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = fast(5)
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AttemptFailure::fatal(Error::Config("bad key".into()))) }
            })
            .await;
        assert!(matches!(result, Err(Error::Config(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let _ = fast(0)
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, AttemptFailure>(()) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
