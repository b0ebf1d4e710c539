//! Per-exchange collection and the cross-exchange merge.

use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::api::{
    bingx, bybit, signature::now_unix_millis, ApiError, BingxClient, BybitClient, ChunkedHistoryFetcher,
    ExchangeClient,
};
use crate::models::{Balance, FuturesBalance, FuturesTrade, Position, Settings, Trade};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeKind {
    BingX,
    Bybit,
}

impl ExchangeKind {
    pub const ALL: [ExchangeKind; 2] = [ExchangeKind::BingX, ExchangeKind::Bybit];

    pub fn name(&self) -> &'static str {
        match self {
            ExchangeKind::BingX => bingx::EXCHANGE_NAME,
            ExchangeKind::Bybit => bybit::EXCHANGE_NAME,
        }
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything one exchange returned in one run
#[derive(Debug, Clone, Default)]
pub struct ExchangeSnapshot {
    pub spot_balances: Vec<Balance>,
    pub futures_balances: Vec<FuturesBalance>,
    pub spot_trades: Vec<Trade>,
    pub futures_trades: Vec<FuturesTrade>,
    pub positions: Vec<Position>,
}

impl ExchangeSnapshot {
    pub fn record_count(&self) -> usize {
        self.spot_balances.len()
            + self.futures_balances.len()
            + self.spot_trades.len()
            + self.futures_trades.len()
            + self.positions.len()
    }
}

#[derive(Debug)]
pub enum ProcessOutcome {
    Completed(ExchangeSnapshot),
    /// Credentials missing or placeholder; nothing was requested
    NotConfigured { exchange: ExchangeKind },
}

enum ClientSlot {
    Ready(Arc<dyn ExchangeClient>),
    NotConfigured,
    /// Credentials were present but the client could not be built
    Unavailable(String),
}

/// Wraps one exchange client, or records why there is none.
pub struct ExchangeProcessor {
    kind: ExchangeKind,
    client: ClientSlot,
    history: ChunkedHistoryFetcher,
}

impl ExchangeProcessor {
    /// Build the processor for `kind` from settings. Placeholder keys leave it
    /// unconfigured; any other build error is reported as a failure when it runs.
    pub fn from_settings(kind: ExchangeKind, settings: &Settings) -> Self {
        let history = ChunkedHistoryFetcher::from_settings(&settings.history);
        let built: Result<Arc<dyn ExchangeClient>, ApiError> = match kind {
            ExchangeKind::BingX => BingxClient::new(&settings.bingx, &settings.rate_limiting)
                .map(|client| Arc::new(client) as Arc<dyn ExchangeClient>),
            ExchangeKind::Bybit => BybitClient::new(&settings.bybit, &settings.rate_limiting)
                .map(|client| Arc::new(client) as Arc<dyn ExchangeClient>),
        };

        match built {
            Ok(client) => Self::with_client(kind, client, history),
            Err(ApiError::NotConfigured(_)) => Self::not_configured(kind, history),
            Err(e) => {
                log::error!("{}: failed to create client: {}", kind, e);
                Self::unavailable(kind, e, history)
            }
        }
    }

    pub fn with_client(kind: ExchangeKind, client: Arc<dyn ExchangeClient>, history: ChunkedHistoryFetcher) -> Self {
        Self {
            kind,
            client: ClientSlot::Ready(client),
            history,
        }
    }

    pub fn not_configured(kind: ExchangeKind, history: ChunkedHistoryFetcher) -> Self {
        Self {
            kind,
            client: ClientSlot::NotConfigured,
            history,
        }
    }

    pub fn unavailable(kind: ExchangeKind, error: ApiError, history: ChunkedHistoryFetcher) -> Self {
        Self {
            kind,
            client: ClientSlot::Unavailable(error.to_string()),
            history,
        }
    }

    pub fn kind(&self) -> ExchangeKind {
        self.kind
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.client, ClientSlot::Ready(_))
    }

    /// Collect balances, positions and the chunked trade history.
    ///
    /// Endpoint failures are absorbed by the client wrappers and the chunked
    /// fetcher, so the only errors are a client that could not be built and
    /// running past `deadline`.
    pub async fn process_exchange_data(&self, deadline: Option<Instant>) -> Result<ProcessOutcome, ApiError> {
        let client = match &self.client {
            ClientSlot::Ready(client) => client,
            ClientSlot::NotConfigured => {
                log::warn!("{}: API credentials not configured; skipping", self.kind);
                return Ok(ProcessOutcome::NotConfigured { exchange: self.kind });
            }
            ClientSlot::Unavailable(error) => {
                return Err(ApiError::Unknown(format!("{} client unavailable: {}", self.kind, error)));
            }
        };

        let collect = self.collect(client.as_ref());
        let snapshot = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, collect)
                .await
                .map_err(|_| ApiError::TimeoutError(format!("{} did not finish before the run deadline", self.kind)))?,
            None => collect.await,
        };

        log::info!(
            "{}: {} spot balance(s), {} futures balance(s), {} spot trade(s), {} futures trade(s), {} position(s)",
            self.kind,
            snapshot.spot_balances.len(),
            snapshot.futures_balances.len(),
            snapshot.spot_trades.len(),
            snapshot.futures_trades.len(),
            snapshot.positions.len()
        );

        Ok(ProcessOutcome::Completed(snapshot))
    }

    async fn collect(&self, client: &dyn ExchangeClient) -> ExchangeSnapshot {
        log::info!("{}: fetching account data", self.kind);
        let end_ms = now_unix_millis();

        ExchangeSnapshot {
            spot_balances: client.get_spot_balances().await,
            futures_balances: client.get_futures_balances().await,
            spot_trades: self.history.spot_trades(client, end_ms).await,
            futures_trades: self.history.futures_trades(client, end_ms).await,
            positions: client.get_positions().await,
        }
    }
}

/// How one exchange fared in a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeStatus {
    Completed { records: usize },
    NotConfigured,
    Failed { error: String },
}

/// Merged output of all exchanges for one run
#[derive(Debug, Default)]
pub struct PortfolioReport {
    pub spot_balances: Vec<Balance>,
    pub futures_balances: Vec<FuturesBalance>,
    pub spot_trades: Vec<Trade>,
    pub futures_trades: Vec<FuturesTrade>,
    pub positions: Vec<Position>,
    pub statuses: Vec<(ExchangeKind, ExchangeStatus)>,
}

impl PortfolioReport {
    pub fn is_empty(&self) -> bool {
        self.spot_balances.is_empty()
            && self.futures_balances.is_empty()
            && self.spot_trades.is_empty()
            && self.futures_trades.is_empty()
            && self.positions.is_empty()
    }

    pub fn status_of(&self, kind: ExchangeKind) -> Option<&ExchangeStatus> {
        self.statuses
            .iter()
            .find(|(exchange, _)| *exchange == kind)
            .map(|(_, status)| status)
    }

    fn merge(&mut self, snapshot: ExchangeSnapshot) {
        self.spot_balances.extend(snapshot.spot_balances);
        self.futures_balances.extend(snapshot.futures_balances);
        self.spot_trades.extend(snapshot.spot_trades);
        self.futures_trades.extend(snapshot.futures_trades);
        self.positions.extend(snapshot.positions);
    }
}

pub struct PortfolioAggregator {
    processors: Vec<ExchangeProcessor>,
    run_deadline: Option<Duration>,
}

impl PortfolioAggregator {
    pub fn new(processors: Vec<ExchangeProcessor>, run_deadline: Option<Duration>) -> Self {
        Self {
            processors,
            run_deadline,
        }
    }

    /// One processor per supported exchange
    pub fn from_settings(settings: &Settings) -> Self {
        let processors = ExchangeKind::ALL
            .iter()
            .map(|kind| ExchangeProcessor::from_settings(*kind, settings))
            .collect();
        Self::new(processors, settings.history.run_deadline_seconds.map(Duration::from_secs))
    }

    pub fn processors(&self) -> &[ExchangeProcessor] {
        &self.processors
    }

    /// Run every processor concurrently and merge what succeeded.
    ///
    /// Output keeps processor order regardless of completion order.
    pub async fn process_all(&self) -> PortfolioReport {
        let deadline = self.run_deadline.map(|budget| Instant::now() + budget);

        let outcomes = join_all(
            self.processors
                .iter()
                .map(|processor| processor.process_exchange_data(deadline)),
        )
        .await;

        let mut report = PortfolioReport::default();
        for (processor, outcome) in self.processors.iter().zip(outcomes) {
            let status = match outcome {
                Ok(ProcessOutcome::Completed(snapshot)) => {
                    let records = snapshot.record_count();
                    report.merge(snapshot);
                    ExchangeStatus::Completed { records }
                }
                Ok(ProcessOutcome::NotConfigured { .. }) => ExchangeStatus::NotConfigured,
                Err(e) => {
                    log::error!("{}: processing failed: {}", processor.kind(), e);
                    ExchangeStatus::Failed { error: e.to_string() }
                }
            };
            report.statuses.push((processor.kind(), status));
        }

        if report.is_empty() {
            log::warn!("No data was returned by any exchange");
        }

        report
    }
}
