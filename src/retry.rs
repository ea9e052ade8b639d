//! Reusable retry-with-backoff combinator for collaborator calls.
//!
//! Every external call the pipeline makes (listing, download) goes through
//! [`RetryPolicy::run`] with a retryable-error predicate, instead of
//! duplicating backoff loops at each call site.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::types::SyncError;

/// Bounded exponential backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never zero.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Factor applied to the delay after each failed attempt.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            multiplier,
        }
    }

    /// Runs `operation` until it succeeds, fails non-retryably, or exhausts
    /// the attempt budget.
    ///
    /// `label` identifies the operation in retry logs. The `retryable`
    /// predicate decides which errors are worth another attempt; the final
    /// error is returned unchanged once attempts run out.
    pub async fn run<T, F, Fut, P>(
        &self,
        label: &str,
        mut operation: F,
        retryable: P,
    ) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
        P: Fn(&SyncError) -> bool,
    {
        let mut delay = self.base_delay;
        let mut attempt = 1u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && retryable(&err) => {
                    warn!(
                        operation = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying after transient failure"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.mul_f64(self.multiplier);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::ZERO, 1.0)
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = instant_policy(3)
            .run(
                "flaky",
                move || {
                    let counter = counter.clone();
                    async move {
                        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                            Err(SyncError::Transient("blip".into()))
                        } else {
                            Ok(42)
                        }
                    }
                },
                SyncError::is_transient,
            )
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_surface_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = instant_policy(5)
            .run(
                "broken",
                move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Err(SyncError::Config("bad token".into()))
                    }
                },
                SyncError::is_transient,
            )
            .await;
        assert!(matches!(result, Err(SyncError::Config(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_returns_last_error() {
        let result: Result<(), _> = instant_policy(2)
            .run(
                "always-down",
                || async { Err(SyncError::Transient("still down".into())) },
                SyncError::is_transient,
            )
            .await;
        match result {
            Err(SyncError::Transient(msg)) => assert_eq!(msg, "still down"),
            other => panic!("expected transient error, got {other:?}"),
        }
    }
}
