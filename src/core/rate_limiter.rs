//! Token-bucket rate limiting for GitHub API calls
//!
//! The bucket refills continuously at `refill_rate` tokens per second up to
//! `capacity`. Every API call takes one token; when the bucket is empty the
//! caller sleeps for one refill interval and checks again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Default bucket size (GitHub's authenticated request ceiling)
pub const GITHUB_CAPACITY: u32 = 5000;
/// Tokens added per `GITHUB_WINDOW`
pub const GITHUB_REFILL: u32 = 5000;
/// Refill window
pub const GITHUB_WINDOW: Duration = Duration::from_secs(60);

/// Longest single sleep before the bucket is checked again
pub const MAX_WAIT: Duration = Duration::from_secs(60 * 60);

/// Mutable bucket state
#[derive(Debug, Clone)]
pub struct RateBucket {
    /// Currently available tokens, always within `0..=capacity`
    pub tokens: f64,
    /// Maximum number of tokens
    pub capacity: f64,
    /// Tokens added per second
    pub refill_rate: f64,
    /// When tokens were last added
    pub last_refill_at: Instant,
}

impl RateBucket {
    fn full(capacity: f64, refill_rate: f64) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_rate,
            last_refill_at: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill_at);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity);
        self.last_refill_at = now;
    }

    /// Refill, then take one token if available
    fn try_take(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared token-bucket admission gate
///
/// Clones share the same bucket. Refill and debit happen under one lock, so
/// concurrent callers never spend the same token twice.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    bucket: Arc<Mutex<RateBucket>>,
}

impl RateLimiter {
    /// Create a limiter holding `capacity` tokens, refilling `refill` tokens
    /// every `per`
    ///
    /// A zero capacity is treated as 1, and a zero refill as one token per
    /// `per`, so `acquire` always eventually returns.
    pub fn new(capacity: u32, refill: u32, per: Duration) -> Self {
        let capacity = f64::from(capacity.max(1));
        let per_secs = per.as_secs_f64().max(f64::EPSILON);
        let refill_rate = f64::from(refill.max(1)) / per_secs;

        Self {
            bucket: Arc::new(Mutex::new(RateBucket::full(capacity, refill_rate))),
        }
    }

    /// Limiter matching GitHub's API ceiling
    pub fn github_default() -> Self {
        Self::new(GITHUB_CAPACITY, GITHUB_REFILL, GITHUB_WINDOW)
    }

    /// Wait until a token is available, then take it
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                if bucket.try_take(Instant::now()) {
                    return;
                }
                refill_interval(bucket.refill_rate)
            };

            tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Currently available tokens (after refilling)
    pub async fn available(&self) -> f64 {
        let mut bucket = self.bucket.lock().await;
        bucket.refill(Instant::now());
        bucket.tokens
    }

    /// Bucket capacity
    pub async fn capacity(&self) -> f64 {
        self.bucket.lock().await.capacity
    }
}

/// Time for one token to accrue, capped at [`MAX_WAIT`]
fn refill_interval(refill_rate: f64) -> Duration {
    Duration::try_from_secs_f64(1.0 / refill_rate).map_or(MAX_WAIT, |wait| wait.min(MAX_WAIT))
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::github_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refill_interval_is_capped() {
        assert_eq!(refill_interval(2.0), Duration::from_millis(500));
        assert_eq!(refill_interval(1.0 / 7200.0), MAX_WAIT);
        assert_eq!(refill_interval(1.0 / u64::MAX as f64 / 10.0), MAX_WAIT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_window_only_delays() {
        let limiter = RateLimiter::new(1, 1, Duration::from_secs(u64::MAX));
        limiter.acquire().await;

        let second = tokio::time::timeout(Duration::from_secs(3 * 60 * 60), limiter.acquire()).await;
        assert!(second.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_calls_never_block() {
        let limiter = RateLimiter::new(5, 1, Duration::from_secs(1));
        let start = Instant::now();

        for _ in 0..5 {
            limiter.acquire().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(limiter.available().await < 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_past_capacity_waits_one_interval() {
        // 2 tokens per second: one refill interval is 500ms
        let limiter = RateLimiter::new(3, 2, Duration::from_secs(1));
        for _ in 0..3 {
            limiter.acquire().await;
        }

        let start = Instant::now();
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokens_stay_within_bounds() {
        let limiter = RateLimiter::new(4, 10, Duration::from_secs(1));

        for round in 0..20 {
            limiter.acquire().await;
            let tokens = limiter.available().await;
            assert!(tokens >= 0.0, "negative tokens in round {}", round);
            assert!(tokens <= 4.0, "overfull bucket in round {}", round);

            if round % 3 == 0 {
                tokio::time::advance(Duration::from_secs(5)).await;
                let tokens = limiter.available().await;
                assert!(tokens <= 4.0);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_is_capped_at_capacity() {
        let limiter = RateLimiter::new(2, 100, Duration::from_secs(1));
        limiter.acquire().await;

        tokio::time::advance(Duration::from_secs(60)).await;

        assert_eq!(limiter.available().await, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_one_bucket() {
        let limiter = RateLimiter::new(2, 1, Duration::from_secs(10));
        let other = limiter.clone();

        limiter.acquire().await;
        other.acquire().await;

        assert!(limiter.available().await < 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_configuration_is_coerced() {
        let limiter = RateLimiter::new(0, 0, Duration::from_secs(1));
        assert_eq!(limiter.capacity().await, 1.0);

        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[test]
    fn test_github_default_configuration() {
        let limiter = RateLimiter::github_default();
        let bucket = limiter.bucket.try_lock().expect("uncontended");
        assert_eq!(bucket.capacity, 5000.0);
        assert!((bucket.refill_rate - 5000.0 / 60.0).abs() < 1e-9);
    }
}
