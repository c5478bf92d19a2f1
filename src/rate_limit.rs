//! Minimum-delay request throttle
//!
//! Tracks the instant the previous `wait()` released its caller. A new call
//! sleeps until `previous + delay`, and the stored instant moves forward by
//! exactly the amount slept, so time the caller spends working between waits
//! counts toward the delay instead of being added on top of it.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum spacing between consecutive requests
#[derive(Debug)]
pub struct RateLimiter {
    delay: Duration,
    last_release: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter with the given minimum spacing
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_release: Mutex::new(None),
        }
    }

    /// Create a limiter with the spacing given in milliseconds
    pub fn from_millis(delay_ms: u64) -> Self {
        Self::new(Duration::from_millis(delay_ms))
    }

    /// Configured minimum spacing
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Suspend until at least `delay` has passed since the previous release.
    ///
    /// Returns how long the caller was suspended. The lock is held while
    /// sleeping so concurrent callers queue behind each other.
    pub async fn wait(&self) -> Duration {
        let mut last_release = self.last_release.lock().await;
        let now = Instant::now();

        let pause = match *last_release {
            Some(previous) => (previous + self.delay).saturating_duration_since(now),
            None => Duration::ZERO,
        };

        *last_release = Some(now + pause);

        if !pause.is_zero() {
            tracing::trace!(pause_ms = pause.as_millis() as u64, "Rate limiter sleeping");
            tokio::time::sleep(pause).await;
        }

        pause
    }

    /// Forget the previous release so the next `wait()` returns immediately
    pub async fn reset(&self) {
        *self.last_release.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_wait_is_immediate() {
        let limiter = RateLimiter::from_millis(500);
        assert_eq!(limiter.wait().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_waits_span_at_least_n_minus_one_delays() {
        let limiter = RateLimiter::from_millis(200);
        let start = Instant::now();

        for _ in 0..5 {
            limiter.wait().await;
        }

        assert!(start.elapsed() >= Duration::from_millis(4 * 200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_work_counts_toward_delay() {
        let limiter = RateLimiter::from_millis(300);
        limiter.wait().await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        let paused = limiter.wait().await;
        assert_eq!(paused, Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_beyond_delay_returns_immediately() {
        let limiter = RateLimiter::from_millis(100);
        limiter.wait().await;

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(limiter.wait().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_state() {
        let limiter = RateLimiter::from_millis(1_000);
        limiter.wait().await;
        limiter.reset().await;

        assert_eq!(limiter.wait().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_never_sleeps() {
        let limiter = RateLimiter::new(Duration::ZERO);
        for _ in 0..3 {
            assert_eq!(limiter.wait().await, Duration::ZERO);
        }
    }
}
