use std::future::Future;
use std::time::Duration;

use super::client::{ExchangeClient, TimeRange};
use super::error::ApiError;
use crate::models::{FuturesTrade, HistorySettings, Trade};

const DAY: Duration = Duration::from_secs(86_400);

/// Split `[end_ms - total, end_ms)` into contiguous windows of at most
/// `per_call`, walking backward. The newest window comes first; the oldest
/// may be shorter when `total` is not a multiple of `per_call`.
pub fn plan_chunks(end_ms: i64, total: Duration, per_call: Duration) -> Vec<TimeRange> {
    let total_ms = total.as_millis() as i64;
    let step_ms = per_call.as_millis() as i64;
    if total_ms <= 0 || step_ms <= 0 {
        return Vec::new();
    }

    let start_ms = end_ms - total_ms;
    let mut chunks = Vec::new();
    let mut chunk_end = end_ms;
    while chunk_end > start_ms {
        let chunk_start = (chunk_end - step_ms).max(start_ms);
        chunks.push(TimeRange::new(chunk_start, chunk_end));
        chunk_end = chunk_start;
    }
    chunks
}

/// Walks a long lookback through a client's bounded history endpoint
#[derive(Debug, Clone)]
pub struct ChunkedHistoryFetcher {
    total_window: Duration,
    chunk_window: Duration,
    inter_chunk_delay: Duration,
}

impl ChunkedHistoryFetcher {
    pub fn new(total_window: Duration, chunk_window: Duration, inter_chunk_delay: Duration) -> Self {
        Self {
            total_window,
            chunk_window,
            inter_chunk_delay,
        }
    }

    pub fn from_settings(settings: &HistorySettings) -> Self {
        Self::new(
            DAY * settings.lookback_days,
            DAY * settings.chunk_days.max(1),
            Duration::from_millis(settings.chunk_delay_ms),
        )
    }

    pub fn total_window(&self) -> Duration {
        self.total_window
    }

    /// Chunk size actually used for a client: the configured size, capped by
    /// what the exchange accepts per call.
    pub fn chunk_window_for(&self, client: &dyn ExchangeClient) -> Duration {
        self.chunk_window.min(client.max_history_window())
    }

    /// Fetch every chunk ending at `end_ms`, newest chunk first.
    ///
    /// A failing chunk is logged and skipped; the rest are still fetched and
    /// concatenated in chunk order.
    pub async fn fetch<T, F, Fut>(
        &self,
        label: &str,
        end_ms: i64,
        chunk_window: Duration,
        mut fetch_chunk: F,
    ) -> Vec<T>
    where
        F: FnMut(TimeRange) -> Fut,
        Fut: Future<Output = Result<Vec<T>, ApiError>>,
    {
        let chunks = plan_chunks(end_ms, self.total_window, chunk_window);
        let total = chunks.len();
        let mut merged = Vec::new();

        for (index, range) in chunks.into_iter().enumerate() {
            if index > 0 && !self.inter_chunk_delay.is_zero() {
                tokio::time::sleep(self.inter_chunk_delay).await;
            }

            match fetch_chunk(range).await {
                Ok(mut items) => {
                    log::debug!(
                        "{}: chunk {}/{} [{}, {}) returned {} record(s)",
                        label,
                        index + 1,
                        total,
                        range.start_ms,
                        range.end_ms,
                        items.len()
                    );
                    merged.append(&mut items);
                }
                Err(e) => {
                    log::error!(
                        "{}: chunk {}/{} [{}, {}) failed, skipping: {}",
                        label,
                        index + 1,
                        total,
                        range.start_ms,
                        range.end_ms,
                        e
                    );
                }
            }
        }

        merged
    }

    /// Spot trades over the whole lookback, newest chunk first
    pub async fn spot_trades(&self, client: &dyn ExchangeClient, end_ms: i64) -> Vec<Trade> {
        let label = format!("{} spot trades", client.exchange_name());
        let window = self.chunk_window_for(client);
        self.fetch(&label, end_ms, window, move |range| client.fetch_spot_trades(range))
            .await
    }

    /// Futures trades over the whole lookback, newest chunk first
    pub async fn futures_trades(&self, client: &dyn ExchangeClient, end_ms: i64) -> Vec<FuturesTrade> {
        let label = format!("{} futures trades", client.exchange_name());
        let window = self.chunk_window_for(client);
        self.fetch(&label, end_ms, window, move |range| client.fetch_futures_trades(range))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const NOW: i64 = 1_704_067_200_000;

    #[test]
    fn test_thirty_days_in_six_day_chunks() {
        let chunks = plan_chunks(NOW, DAY * 30, DAY * 6);
        assert_eq!(chunks.len(), 5);

        // Newest first, contiguous, no gaps and no overlaps
        assert_eq!(chunks[0].end_ms, NOW);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].start_ms, pair[1].end_ms);
        }
        assert_eq!(chunks[4].start_ms, NOW - (DAY * 30).as_millis() as i64);

        for chunk in &chunks {
            assert_eq!(chunk.duration(), DAY * 6);
        }
    }

    #[test]
    fn test_remainder_chunk_is_shorter() {
        let chunks = plan_chunks(NOW, DAY * 10, DAY * 4);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].duration(), DAY * 2);
        assert_eq!(chunks[2].start_ms, NOW - (DAY * 10).as_millis() as i64);
    }

    #[test]
    fn test_degenerate_plans_are_empty() {
        assert!(plan_chunks(NOW, Duration::ZERO, DAY).is_empty());
        assert!(plan_chunks(NOW, DAY, Duration::ZERO).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_issues_one_call_per_chunk() {
        let fetcher = ChunkedHistoryFetcher::new(DAY * 30, DAY * 6, Duration::ZERO);
        let seen = Mutex::new(Vec::new());

        let results = fetcher
            .fetch("test", NOW, DAY * 6, |range| {
                seen.lock().unwrap().push(range);
                async move { Ok(vec![range.start_ms]) }
            })
            .await;

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 5);
        assert_eq!(seen, plan_chunks(NOW, DAY * 30, DAY * 6));
        // Results keep chunk order (newest first)
        assert_eq!(results, seen.iter().map(|r| r.start_ms).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_failing_chunk_is_skipped() {
        let fetcher = ChunkedHistoryFetcher::new(DAY * 30, DAY * 6, Duration::ZERO);
        let calls = Mutex::new(0usize);

        let results = fetcher
            .fetch("test", NOW, DAY * 6, |range| {
                let call = {
                    let mut calls = calls.lock().unwrap();
                    *calls += 1;
                    *calls
                };
                async move {
                    if call == 2 {
                        Err(ApiError::HttpStatus {
                            status: 500,
                            body: "boom".to_string(),
                        })
                    } else {
                        Ok(vec![range.end_ms, range.start_ms])
                    }
                }
            })
            .await;

        assert_eq!(*calls.lock().unwrap(), 5);
        assert_eq!(results.len(), 8);
    }

    #[tokio::test]
    async fn test_inter_chunk_delay_is_applied() {
        let fetcher = ChunkedHistoryFetcher::new(DAY * 3, DAY, Duration::from_millis(30));

        let start = std::time::Instant::now();
        let results: Vec<i64> = fetcher
            .fetch("test", NOW, DAY, |_range| async { Ok(Vec::new()) })
            .await;

        assert!(results.is_empty());
        // Three chunks => two pauses
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_from_settings() {
        let fetcher = ChunkedHistoryFetcher::from_settings(&HistorySettings::default());
        assert_eq!(fetcher.total_window(), DAY * 30);
        assert_eq!(fetcher.chunk_window, DAY * 6);
        assert_eq!(fetcher.inter_chunk_delay, Duration::from_millis(500));
    }
}
