use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::ApiError;
use crate::models::{Balance, FuturesBalance, FuturesTrade, Position, Trade};

/// Configuration for request pacing
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub requests_per_second: f64,
}

/// Half-open time window `[start_ms, end_ms)` in Unix milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeRange {
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }

    /// Last millisecond inside the window, for APIs whose `endTime` is inclusive
    pub fn inclusive_end(&self) -> i64 {
        (self.end_ms - 1).max(self.start_ms)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis((self.end_ms - self.start_ms).max(0) as u64)
    }
}

/// Core trait that all exchange clients implement
///
/// The `fetch_*` methods report failures to the caller. The `get_*` wrappers
/// are what report-facing code uses: they never fail, and any error becomes
/// an empty list after being logged, so one broken endpoint cannot abort a run.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Exchange name as it appears in normalized records (e.g. "BingX")
    fn exchange_name(&self) -> &str;

    /// Pacing applied to this client's requests
    fn rate_limit(&self) -> RateLimitConfig;

    /// Longest window a single history request may cover
    fn max_history_window(&self) -> Duration;

    async fn fetch_spot_balances(&self) -> Result<Vec<Balance>, ApiError>;

    async fn fetch_futures_balances(&self) -> Result<Vec<FuturesBalance>, ApiError>;

    /// Spot trade history for one window no longer than `max_history_window`
    async fn fetch_spot_trades(&self, range: TimeRange) -> Result<Vec<Trade>, ApiError>;

    /// Futures trade history for one window no longer than `max_history_window`
    async fn fetch_futures_trades(&self, range: TimeRange) -> Result<Vec<FuturesTrade>, ApiError>;

    /// Open positions; closed (near-zero) positions are already filtered out
    async fn fetch_positions(&self) -> Result<Vec<Position>, ApiError>;

    async fn get_spot_balances(&self) -> Vec<Balance> {
        or_empty(self.exchange_name(), "spot balances", self.fetch_spot_balances().await)
    }

    async fn get_futures_balances(&self) -> Vec<FuturesBalance> {
        or_empty(self.exchange_name(), "futures balances", self.fetch_futures_balances().await)
    }

    async fn get_positions(&self) -> Vec<Position> {
        or_empty(self.exchange_name(), "positions", self.fetch_positions().await)
    }
}

fn or_empty<T>(exchange: &str, what: &str, result: Result<Vec<T>, ApiError>) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            log::error!("{}: failed to fetch {}: {}", exchange, what, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingClient;

    #[async_trait]
    impl ExchangeClient for FailingClient {
        fn exchange_name(&self) -> &str {
            "Failing"
        }

        fn rate_limit(&self) -> RateLimitConfig {
            RateLimitConfig {
                requests_per_second: 1.0,
            }
        }

        fn max_history_window(&self) -> Duration {
            Duration::from_secs(86_400)
        }

        async fn fetch_spot_balances(&self) -> Result<Vec<Balance>, ApiError> {
            Err(ApiError::TimeoutError("no response".to_string()))
        }

        async fn fetch_futures_balances(&self) -> Result<Vec<FuturesBalance>, ApiError> {
            Err(ApiError::Unknown("boom".to_string()))
        }

        async fn fetch_spot_trades(&self, _range: TimeRange) -> Result<Vec<Trade>, ApiError> {
            Ok(Vec::new())
        }

        async fn fetch_futures_trades(&self, _range: TimeRange) -> Result<Vec<FuturesTrade>, ApiError> {
            Ok(Vec::new())
        }

        async fn fetch_positions(&self) -> Result<Vec<Position>, ApiError> {
            Err(ApiError::HttpStatus {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_get_wrappers_turn_errors_into_empty_lists() {
        let client = FailingClient;
        assert!(client.get_spot_balances().await.is_empty());
        assert!(client.get_futures_balances().await.is_empty());
        assert!(client.get_positions().await.is_empty());
    }

    #[test]
    fn test_time_range_bounds() {
        let range = TimeRange::new(1_000, 2_000);
        assert_eq!(range.inclusive_end(), 1_999);
        assert_eq!(range.duration(), Duration::from_millis(1_000));

        let empty = TimeRange::new(1_000, 1_000);
        assert_eq!(empty.inclusive_end(), 1_000);
        assert_eq!(empty.duration(), Duration::ZERO);
    }
}
