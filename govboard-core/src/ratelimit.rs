//! Client-side pacing for APIs with strict request budgets (ip-api.com,
//! GitHub search).
//!
//! Callers queue on a single async mutex, so requests leave one at a time and
//! at least `min_delay` apart. After a 429 the current backoff is added on
//! top of `min_delay` until a request succeeds again.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub min_delay: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RateLimitConfig {
    /// ip-api.com allows 45 requests per minute on the free tier.
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(1_400),
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct State {
    last_call: Option<Instant>,
    backoff: Duration,
    throttled: bool,
}

#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<State>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            state: Mutex::new(State {
                last_call: None,
                backoff: config.initial_backoff,
                throttled: false,
            }),
            config,
        }
    }

    /// Wait for this caller's slot.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;

        let spacing = if state.throttled {
            self.config.min_delay + state.backoff
        } else {
            self.config.min_delay
        };

        if let Some(last) = state.last_call {
            let ready_at = last + spacing;
            if ready_at > Instant::now() {
                debug!(wait_ms = (ready_at - Instant::now()).as_millis() as u64, "rate limiter waiting");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        state.last_call = Some(Instant::now());
    }

    /// Record a 429: the backoff doubles, capped at `max_backoff`.
    pub async fn on_rate_limited(&self) {
        let mut state = self.state.lock().await;
        state.backoff = (state.backoff * 2)
            .max(self.config.initial_backoff)
            .min(self.config.max_backoff);
        state.throttled = true;
        debug!(backoff_ms = state.backoff.as_millis() as u64, "backing off after 429");
    }

    pub async fn on_success(&self) {
        let mut state = self.state.lock().await;
        state.backoff = self.config.initial_backoff;
        state.throttled = false;
    }

    /// Extra spacing applied while throttled.
    pub async fn current_backoff(&self) -> Duration {
        self.state.lock().await.backoff
    }

    pub async fn is_throttled(&self) -> bool {
        self.state.lock().await.throttled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn config() -> RateLimitConfig {
        RateLimitConfig {
            min_delay: Duration::from_millis(100),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(2),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn calls_are_spaced_by_min_delay() {
        let limiter = Arc::new(RateLimiter::new(config()));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                Instant::now()
            }));
        }
        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        times.sort();

        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(100));
        }
        assert!(times[3] - start >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_doubles_up_to_ceiling_and_resets() {
        let limiter = RateLimiter::new(config());

        assert_eq!(limiter.current_backoff().await, Duration::from_millis(500));
        limiter.on_rate_limited().await;
        assert_eq!(limiter.current_backoff().await, Duration::from_secs(1));

        let mut previous = limiter.current_backoff().await;
        for _ in 0..5 {
            limiter.on_rate_limited().await;
            let next = limiter.current_backoff().await;
            assert!(next >= (previous * 2).min(Duration::from_secs(2)));
            assert!(next <= Duration::from_secs(2));
            previous = next;
        }
        assert_eq!(previous, Duration::from_secs(2));

        limiter.on_success().await;
        assert_eq!(limiter.current_backoff().await, Duration::from_millis(500));
        assert!(!limiter.is_throttled().await);
    }

    #[tokio::test(start_paused = true)]
    async fn first_429_doubles_initial_backoff() {
        let limiter = RateLimiter::new(config());
        limiter.on_rate_limited().await;
        assert!(limiter.current_backoff().await >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_spacing_adds_backoff_to_min_delay() {
        let limiter = RateLimiter::new(config());
        limiter.acquire().await;
        limiter.on_rate_limited().await;

        let before = Instant::now();
        limiter.acquire().await;
        assert!(Instant::now() - before >= Duration::from_millis(1_100));

        limiter.on_success().await;
        let before = Instant::now();
        limiter.acquire().await;
        let waited = Instant::now() - before;
        assert!(waited >= Duration::from_millis(100));
        assert!(waited < Duration::from_millis(500));
    }
}
