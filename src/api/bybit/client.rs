use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::api::{
    client::{ExchangeClient, RateLimitConfig, TimeRange},
    clock_skew::{ClockSkewCompensator, SkewDecision},
    error::ApiError,
    rate_limiter::RateLimiter,
    retry::{AttemptOutcome, RetryExecutor, RetryPolicy},
    signature::{now_unix_millis, sign_bybit},
    transport::{self, MAX_LOGGED_BODY},
    wire::{self, truncate_body},
};
use crate::models::{
    Balance, ExchangeSettings, FuturesBalance, FuturesTrade, Position, RateLimitSettings, Trade,
    UnknownPositionSide,
};

use super::{
    mapper,
    types::{BybitResponse, ClosedPnlRecord, Execution, OrderRecord, PagedList, PositionRecord, WalletBalanceResult},
    EXCHANGE_NAME,
};

pub const BASE_URL: &str = "https://api.bybit.com";
pub const DEFAULT_RECV_WINDOW_MS: u64 = 5000;

const WALLET_BALANCE_ENDPOINT: &str = "/v5/account/wallet-balance";
const EXECUTION_ENDPOINT: &str = "/v5/execution/list";
const ORDER_HISTORY_ENDPOINT: &str = "/v5/order/history";
const CLOSED_PNL_ENDPOINT: &str = "/v5/position/closed-pnl";
const POSITION_LIST_ENDPOINT: &str = "/v5/position/list";

/// Records per history page
pub const HISTORY_PAGE_SIZE: usize = 50;
const POSITION_PAGE_SIZE: usize = 200;
/// Pages followed per window before giving up on the cursor
pub const MAX_PAGES: usize = 20;
pub const MAX_HISTORY_WINDOW: Duration = Duration::from_secs(7 * 86_400);
/// Order history, linear executions, closed PnL
const FUTURES_HISTORY_STREAMS: usize = 3;

pub struct BybitClient {
    api_key: String,
    secret_key: String,
    base_url: String,
    recv_window_ms: u64,
    http_client: reqwest::Client,
    rate_limit: RateLimitConfig,
    rate_limiter: RateLimiter,
    retry: RetryExecutor,
    clock: ClockSkewCompensator,
}

impl BybitClient {
    pub fn new(settings: &ExchangeSettings, limits: &RateLimitSettings) -> Result<Self, ApiError> {
        if !settings.is_configured() {
            return Err(ApiError::NotConfigured(EXCHANGE_NAME.to_string()));
        }

        let rate_limit = RateLimitConfig {
            requests_per_second: limits.bybit_requests_per_second,
        };

        Ok(Self {
            api_key: settings.api_key.trim().to_string(),
            secret_key: settings.secret_key.trim().to_string(),
            base_url: settings.base_url_or(BASE_URL).to_string(),
            recv_window_ms: settings.recv_window_ms.unwrap_or(DEFAULT_RECV_WINDOW_MS),
            http_client: transport::build_http_client(Duration::from_secs(limits.request_timeout_seconds))?,
            rate_limit,
            rate_limiter: RateLimiter::new(rate_limit),
            retry: RetryExecutor::new(RetryPolicy::from_settings(limits)),
            clock: ClockSkewCompensator::new(),
        })
    }

    /// Offset currently applied to request timestamps
    pub fn clock_offset_ms(&self) -> i64 {
        self.clock.offset_ms()
    }

    async fn attempt<T>(&self, endpoint: &str, params: &[(&str, String)]) -> AttemptOutcome<T>
    where
        T: DeserializeOwned + Send,
    {
        self.rate_limiter.acquire().await;

        let timestamp = self.clock.adjust(now_unix_millis());
        let query = transport::join_query(params);
        let signature = sign_bybit(timestamp, &self.api_key, self.recv_window_ms, &query, &self.secret_key);

        let url = if query.is_empty() {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}{}?{}", self.base_url, endpoint, query)
        };
        let request = self
            .http_client
            .get(&url)
            .header("X-BAPI-API-KEY", &self.api_key)
            .header("X-BAPI-SIGN", signature)
            .header("X-BAPI-SIGN-TYPE", "2")
            .header("X-BAPI-TIMESTAMP", timestamp.to_string())
            .header("X-BAPI-RECV-WINDOW", self.recv_window_ms.to_string());

        let raw = match transport::send(request).await {
            Ok(raw) => raw,
            Err(failure) => return failure.into(),
        };

        // Recv-window rejections can arrive with any status, so look before classifying
        if let SkewDecision::Applied { skew_ms } = self.clock.observe(&raw.body) {
            return AttemptOutcome::RetryNow(ApiError::ClockSkew { skew_ms });
        }

        if let Err(failure) = transport::check_status(&raw) {
            return failure.into();
        }

        let envelope: BybitResponse<T> = match wire::decode(&raw.body) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::error!(
                    "Bybit {}: failed to parse response: {} - Body: {}",
                    endpoint,
                    e,
                    truncate_body(&raw.body, MAX_LOGGED_BODY)
                );
                return AttemptOutcome::Fatal(ApiError::ParseError(format!("{}: {}", endpoint, e)));
            }
        };

        if !envelope.is_success() {
            log::error!(
                "Bybit {}: exchange error {}: {}",
                endpoint,
                envelope.ret_code,
                envelope.ret_msg
            );
            return AttemptOutcome::Fatal(ApiError::ExchangeError {
                code: envelope.ret_code.to_string(),
                message: envelope.ret_msg,
            });
        }

        match envelope.result {
            Some(result) => AttemptOutcome::Success(result),
            None => AttemptOutcome::Fatal(ApiError::ParseError(format!(
                "{}: response result is empty",
                endpoint
            ))),
        }
    }

    async fn get<T>(&self, endpoint: &str, params: Vec<(&str, String)>) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send,
    {
        let params = params.as_slice();
        let label = format!("Bybit {}", endpoint);
        self.retry
            .execute(&label, move || self.attempt(endpoint, params))
            .await
    }

    /// Follow `nextPageCursor` until it runs out or [`MAX_PAGES`] is reached.
    async fn get_all_pages<T>(
        &self,
        endpoint: &str,
        params: Vec<(&'static str, String)>,
        page_size: usize,
    ) -> Result<Vec<T>, ApiError>
    where
        T: DeserializeOwned + Send,
    {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 1..=MAX_PAGES {
            let mut page_params = params.clone();
            page_params.push(("limit", page_size.to_string()));
            if let Some(cursor) = &cursor {
                page_params.push(("cursor", cursor.clone()));
            }

            let mut result: PagedList<T> = self.get(endpoint, page_params).await?;
            let next = result.next_cursor();
            log::debug!(
                "Bybit {}: page {} returned {} record(s)",
                endpoint,
                page,
                result.list.len()
            );
            let page_len = result.list.len();
            items.append(&mut result.list);

            match next {
                Some(next) if page_len > 0 => {
                    if page == MAX_PAGES {
                        log::warn!(
                            "Bybit {}: stopped after {} pages; remaining records were not fetched",
                            endpoint,
                            MAX_PAGES
                        );
                    }
                    cursor = Some(next);
                }
                _ => break,
            }
        }

        Ok(items)
    }

    fn window_params(category: &str, range: TimeRange) -> Vec<(&'static str, String)> {
        vec![
            ("category", category.to_string()),
            ("startTime", range.start_ms.to_string()),
            ("endTime", range.inclusive_end().to_string()),
        ]
    }

    async fn wallet_balance(&self) -> Result<WalletBalanceResult, ApiError> {
        self.get(WALLET_BALANCE_ENDPOINT, vec![("accountType", "UNIFIED".to_string())])
            .await
    }
}

#[async_trait]
impl ExchangeClient for BybitClient {
    fn exchange_name(&self) -> &str {
        EXCHANGE_NAME
    }

    fn rate_limit(&self) -> RateLimitConfig {
        self.rate_limit
    }

    fn max_history_window(&self) -> Duration {
        MAX_HISTORY_WINDOW
    }

    async fn fetch_spot_balances(&self) -> Result<Vec<Balance>, ApiError> {
        let result = self.wallet_balance().await?;
        Ok(mapper::map_spot_balances(&result, chrono::Utc::now()))
    }

    async fn fetch_futures_balances(&self) -> Result<Vec<FuturesBalance>, ApiError> {
        let result = self.wallet_balance().await?;
        Ok(mapper::map_futures_balances(&result, chrono::Utc::now()))
    }

    async fn fetch_spot_trades(&self, range: TimeRange) -> Result<Vec<Trade>, ApiError> {
        let executions: Vec<Execution> = self
            .get_all_pages(EXECUTION_ENDPOINT, Self::window_params("spot", range), HISTORY_PAGE_SIZE)
            .await?;
        Ok(executions.iter().map(mapper::map_execution).collect())
    }

    /// Order-history, linear-fill and closed-PnL rows for the same window, in
    /// that order. The three streams are independent: a failed stream is
    /// logged and the others are kept. Only a window where all of them fail
    /// is an error.
    async fn fetch_futures_trades(&self, range: TimeRange) -> Result<Vec<FuturesTrade>, ApiError> {
        let params = Self::window_params("linear", range);
        let orders = self
            .get_all_pages::<OrderRecord>(ORDER_HISTORY_ENDPOINT, params.clone(), HISTORY_PAGE_SIZE)
            .await;
        let executions = self
            .get_all_pages::<Execution>(EXECUTION_ENDPOINT, params.clone(), HISTORY_PAGE_SIZE)
            .await;
        let closed = self
            .get_all_pages::<ClosedPnlRecord>(CLOSED_PNL_ENDPOINT, params, HISTORY_PAGE_SIZE)
            .await;

        let mut trades = Vec::new();
        let failures: Vec<ApiError> = [
            merge_stream(ORDER_HISTORY_ENDPOINT, orders, mapper::map_order, &mut trades),
            merge_stream(EXECUTION_ENDPOINT, executions, mapper::map_futures_execution, &mut trades),
            merge_stream(CLOSED_PNL_ENDPOINT, closed, mapper::map_closed_pnl, &mut trades),
        ]
        .into_iter()
        .flatten()
        .collect();

        if failures.len() == FUTURES_HISTORY_STREAMS {
            if let Some(first) = failures.into_iter().next() {
                return Err(first);
            }
        }
        Ok(trades)
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>, ApiError> {
        let params = vec![
            ("category", "linear".to_string()),
            ("settleCoin", "USDT".to_string()),
        ];
        let records: Vec<PositionRecord> = self
            .get_all_pages(POSITION_LIST_ENDPOINT, params, POSITION_PAGE_SIZE)
            .await?;

        let mut positions = Vec::new();
        for record in &records {
            match mapper::map_position(record) {
                Ok(Some(position)) => positions.push(position),
                Ok(None) => {}
                Err(e) => log::error!("Bybit: skipping position {}: {}", record.symbol, e),
            }
        }
        Ok(positions)
    }
}

/// Map one futures history stream into `trades`. A failed stream is logged
/// and handed back; records with an unknown side are skipped.
fn merge_stream<R>(
    endpoint: &str,
    fetched: Result<Vec<R>, ApiError>,
    map: impl Fn(&R) -> Result<FuturesTrade, UnknownPositionSide>,
    trades: &mut Vec<FuturesTrade>,
) -> Option<ApiError> {
    match fetched {
        Ok(records) => {
            for record in &records {
                match map(record) {
                    Ok(trade) => trades.push(trade),
                    Err(e) => log::error!("Bybit {}: skipping record: {}", endpoint, e),
                }
            }
            None
        }
        Err(e) => {
            log::warn!("Bybit {}: stream failed, keeping the other futures sources: {}", endpoint, e);
            Some(e)
        }
    }
}
