//! Bounded retry with backoff.
//!
//! Every error is retried up to `max_retries` times. A 429 or 5xx answer
//! waits `base * 2^attempt`; anything else waits a flat `base`. Once the
//! retries are used up the last error is returned.

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before the retry that follows failed attempt `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32, error: &AppError) -> Duration {
        if error.is_retryable_status() {
            self.base_delay
                .saturating_mul(2u32.saturating_pow(attempt.min(16)))
        } else {
            self.base_delay
        }
    }

    /// Run `op` until it succeeds or the retries are exhausted.
    ///
    /// `op` receives the 0-based attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_retries => {
                    let delay = self.delay_for(attempt, &err);
                    log::warn!(
                        "{label}: attempt {}/{} failed: {err}; retrying in {delay:?}",
                        attempt + 1,
                        self.max_retries + 1
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn test_delays_exponential_for_server_errors() {
        let policy = RetryPolicy::new(2, Duration::from_millis(800));
        let err = AppError::status("u", 503);
        let delays: Vec<_> = (0..3).map(|a| policy.delay_for(a, &err)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(800),
                Duration::from_millis(1600),
                Duration::from_millis(3200)
            ]
        );
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_delays_flat_for_other_errors() {
        let policy = RetryPolicy::new(2, Duration::from_millis(400));
        let err = AppError::status("u", 404);
        assert_eq!(policy.delay_for(0, &err), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3, &err), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_recovers_after_two_failures() {
        let policy = RetryPolicy::new(2, Duration::from_millis(800));
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let started = tokio::time::Instant::now();

        let value = policy
            .run("test", move |_| async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AppError::status("u", 503))
                } else {
                    Ok(7)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(800 + 1600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_last_error() {
        let policy = RetryPolicy::new(2, Duration::from_millis(10));
        let calls = AtomicU32::new(0);

        let err = policy
            .run("test", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err::<(), _>(AppError::status("u", 400 + attempt as u16)) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.http_status(), Some(402));
    }
}
