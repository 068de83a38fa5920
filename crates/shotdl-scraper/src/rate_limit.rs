//! Retry with linear backoff for image downloads.
//!
//! Every download failure is treated as transient: CDNs intermittently
//! answer with 403/5xx or an HTML error page, and a later attempt often
//! succeeds. The last attempt's error is the one reported.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Delay after failed attempt `attempt` (1-based): `backoff_base_ms * attempt`.
///
/// | Failed attempt | Sleep before next attempt (base 1000 ms) |
/// |----------------|------------------------------------------|
/// | 1              | 1 s                                      |
/// | 2              | 2 s                                      |
#[must_use]
pub fn backoff_delay(backoff_base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(backoff_base_ms.saturating_mul(u64::from(attempt)))
}

/// Runs `operation` up to `max_attempts` times in total, sleeping
/// [`backoff_delay`] between attempts. No sleep follows the final attempt.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= max_attempts => return Err(err),
            Err(err) => {
                let delay = backoff_delay(backoff_base_ms, attempt);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "download attempt failed; retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn bad_status(status: u16) -> ScraperError {
        ScraperError::UnexpectedStatus {
            status,
            url: "https://cdn.example.com/a.png".to_owned(),
        }
    }

    #[test]
    fn backoff_is_linear_and_strictly_increasing() {
        let delays: Vec<Duration> = (1..=3).map(|n| backoff_delay(1_000, n)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(3)
            ]
        );
        assert!(delays.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, ScraperError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(bad_status(503))
                } else {
                    Ok::<u32, ScraperError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn surfaces_final_attempt_error_after_exactly_max_attempts() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ScraperError>(bad_status(500 + u16::try_from(n).unwrap()))
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        assert!(
            matches!(result, Err(ScraperError::UnexpectedStatus { status: 502, .. })),
            "expected the third attempt's error, got: {result:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_attempts_but_not_after_last() {
        let started = tokio::time::Instant::now();
        let result = retry_with_backoff(3, 1_000, || async {
            Err::<(), ScraperError>(bad_status(404))
        })
        .await;
        assert!(result.is_err());
        // 1s after the first failure, 2s after the second, nothing after the third.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let _ = retry_with_backoff(0, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<(), ScraperError>(bad_status(500))
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }
}
