use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::client::RateLimitConfig;

/// Longest spacing a configured rate can produce
pub const MAX_INTERVAL: Duration = Duration::from_secs(3600);

/// Single-slot request pacer.
///
/// Unlike a token bucket this never allows bursts: consecutive `acquire`
/// calls are spaced by at least `1 / requests_per_second`. The lock is held
/// across the sleep, so concurrent callers queue up and leave one at a time.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter from configuration
    pub fn new(config: RateLimitConfig) -> Self {
        let per_second = if config.requests_per_second.is_finite() && config.requests_per_second > 0.0 {
            config.requests_per_second
        } else {
            1.0
        };

        Self {
            min_interval: Duration::try_from_secs_f64(1.0 / per_second)
                .unwrap_or(MAX_INTERVAL)
                .min(MAX_INTERVAL),
            last_request: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the minimum interval since the previous request has passed
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }
}
