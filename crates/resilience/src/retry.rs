//! Retry-with-backoff wrapper.

use std::future::Future;
use std::time::Duration;

use crate::error::CallError;
use crate::tracker::CallTracker;

/// Retry budget and backoff schedule.
///
/// The delay before retry `n` (0-indexed) is `base_delay * 2^n`, giving
/// the default schedule of 1s, 2s, 4s.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

    /// Creates a policy with an explicit budget and base delay.
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Returns the backoff delay before the given 0-indexed retry.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RETRIES, Self::DEFAULT_BASE_DELAY)
    }
}

/// Runs an operation with keyed loading tracking and retry-with-backoff.
///
/// The loading flag for `key` is set for the whole call sequence and
/// cleared at the end, together with the attempt counter, on success and
/// on final failure alike. Attempts under one key are strictly
/// sequential; there is no way to cancel a sequence once started.
///
/// Only errors whose kind is retryable are retried, and only while the
/// budget lasts and `retry_enabled` holds. The final error is re-raised
/// annotated with `key` as its originating context.
pub async fn with_retry<T, F, Fut>(
    tracker: &CallTracker,
    policy: &RetryPolicy,
    key: &str,
    mut operation: F,
    retry_enabled: bool,
) -> Result<T, CallError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CallError>>,
{
    tracker.set_loading(key, true);

    let max_retries = if retry_enabled { policy.max_retries } else { 0 };
    let result = loop {
        match operation().await {
            Ok(value) => break Ok(value),
            Err(error) => {
                let attempts = tracker.attempts(key);
                if attempts >= max_retries || !error.kind().is_retryable() {
                    break Err(error);
                }

                let delay = policy.delay_for(attempts);
                tracker.record_attempt(key);
                tracing::debug!(
                    key,
                    attempt = attempts + 1,
                    delay_ms = delay.as_millis() as u64,
                    kind = %error.kind(),
                    "transient failure, backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }
        }
    };

    tracker.clear(key);
    result.map_err(|e| e.with_context(key))
}
