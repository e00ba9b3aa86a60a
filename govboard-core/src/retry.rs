//! Bounded retries for flaky HTTP calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay between every attempt.
    Fixed,
    /// Delay doubles after each attempt, capped at `max`.
    Exponential { max: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    pub fn exponential(max_attempts: u32, delay: Duration, max: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Exponential { max },
        }
    }

    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                self.delay.saturating_mul(factor).min(max)
            }
        }
    }
}

impl Default for RetryPolicy {
    /// Three attempts two seconds apart.
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(2))
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` is reached. The last error is returned.
pub async fn retry<T, E, F, Fut, P>(policy: &RetryPolicy, mut op: F, is_retryable: P) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && is_retryable(&err) => {
                let delay = policy.delay_after(attempt);
                warn!(attempt, max_attempts, delay_ms = delay.as_millis() as u64, error = %err, "retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// 429 and 5xx are worth another try.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Connection-level failures that usually clear up on their own.
pub fn is_transient_message(message: &str) -> bool {
    const TRANSIENT: &[&str] = &[
        "ECONNRESET",
        "ETIMEDOUT",
        "ECONNREFUSED",
        "socket hang up",
        "connection reset",
        "connection closed",
        "timed out",
    ];
    let lower = message.to_ascii_lowercase();
    TRANSIENT
        .iter()
        .any(|needle| lower.contains(&needle.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry(
            &RetryPolicy::fixed(3, Duration::from_secs(2)),
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(format!("HTTP 503 on attempt {n}"))
                } else {
                    Ok(n)
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry(
            &RetryPolicy::default(),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("HTTP 401".to_string())
            },
            |err| err.contains("503"),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry(
            &RetryPolicy::fixed(4, Duration::from_millis(10)),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("socket hang up".to_string())
            },
            |err| is_transient_message(err),
        )
        .await;

        assert_eq!(result, Err("socket hang up".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn exponential_delay_is_capped() {
        let policy = RetryPolicy::exponential(10, Duration::from_secs(1), Duration::from_secs(5));
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
        assert_eq!(policy.delay_after(4), Duration::from_secs(5));
        assert_eq!(policy.delay_after(40), Duration::from_secs(5));
    }

    #[test]
    fn status_and_message_classification() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(502));
        assert!(!is_retryable_status(404));
        assert!(is_transient_message("read ECONNRESET"));
        assert!(is_transient_message("Connection reset by peer"));
        assert!(!is_transient_message("invalid token"));
    }
}
