use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::api::{
    client::{ExchangeClient, RateLimitConfig, TimeRange},
    error::ApiError,
    rate_limiter::RateLimiter,
    retry::{AttemptOutcome, RetryExecutor, RetryPolicy},
    signature::{now_unix_millis, sign_bingx},
    transport::{self, MAX_LOGGED_BODY},
    wire::{self, truncate_body},
};
use crate::models::{
    Balance, ExchangeSettings, FuturesBalance, FuturesTrade, Position, RateLimitSettings, Trade,
};

use super::{
    mapper,
    types::{BingxResponse, SpotBalanceData, SpotOrdersData, SwapBalanceData, SwapOrdersData, SwapPosition},
    EXCHANGE_NAME,
};

pub const BASE_URL: &str = "https://open-api.bingx.com";
const API_KEY_HEADER: &str = "X-BX-APIKEY";

const SPOT_BALANCE_ENDPOINT: &str = "/openApi/spot/v1/account/balance";
const SWAP_BALANCE_ENDPOINT: &str = "/openApi/swap/v2/user/balance";
const SPOT_ORDERS_ENDPOINT: &str = "/openApi/spot/v1/trade/historyOrders";
const SWAP_ORDERS_ENDPOINT: &str = "/openApi/swap/v2/trade/allOrders";
const POSITIONS_ENDPOINT: &str = "/openApi/swap/v2/user/positions";

/// Largest page the history endpoints return
pub const MAX_HISTORY_LIMIT: usize = 1000;
/// Widest `startTime..endTime` span a history call accepts
pub const MAX_HISTORY_WINDOW: Duration = Duration::from_secs(7 * 86_400);

pub struct BingxClient {
    api_key: String,
    secret_key: String,
    base_url: String,
    http_client: reqwest::Client,
    rate_limit: RateLimitConfig,
    rate_limiter: RateLimiter,
    retry: RetryExecutor,
}

impl BingxClient {
    pub fn new(settings: &ExchangeSettings, limits: &RateLimitSettings) -> Result<Self, ApiError> {
        if !settings.is_configured() {
            return Err(ApiError::NotConfigured(EXCHANGE_NAME.to_string()));
        }

        let rate_limit = RateLimitConfig {
            requests_per_second: limits.bingx_requests_per_second,
        };

        Ok(Self {
            api_key: settings.api_key.trim().to_string(),
            secret_key: settings.secret_key.trim().to_string(),
            base_url: settings.base_url_or(BASE_URL).to_string(),
            http_client: transport::build_http_client(Duration::from_secs(limits.request_timeout_seconds))?,
            rate_limit,
            rate_limiter: RateLimiter::new(rate_limit),
            retry: RetryExecutor::new(RetryPolicy::from_settings(limits)),
        })
    }

    /// Build the full URL: business params, then `timestamp`, then the
    /// signature over everything before it.
    fn signed_url(&self, endpoint: &str, params: &[(&str, String)]) -> String {
        let mut query = transport::join_query(params);
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&format!("timestamp={}", now_unix_millis()));

        let signature = sign_bingx(&query, &self.secret_key);
        format!("{}{}?{}&signature={}", self.base_url, endpoint, query, signature)
    }

    /// One paced, signed GET and its classification
    async fn attempt<T>(&self, endpoint: &str, params: &[(&str, String)]) -> AttemptOutcome<T>
    where
        T: DeserializeOwned + Send,
    {
        self.rate_limiter.acquire().await;

        let url = self.signed_url(endpoint, params);
        let request = self.http_client.get(&url).header(API_KEY_HEADER, &self.api_key);

        let raw = match transport::send(request).await {
            Ok(raw) => raw,
            Err(failure) => return failure.into(),
        };
        if let Err(failure) = transport::check_status(&raw) {
            return failure.into();
        }

        let envelope: BingxResponse<T> = match wire::decode(&raw.body) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::error!(
                    "BingX {}: failed to parse response: {} - Body: {}",
                    endpoint,
                    e,
                    truncate_body(&raw.body, MAX_LOGGED_BODY)
                );
                return AttemptOutcome::Fatal(ApiError::ParseError(format!("{}: {}", endpoint, e)));
            }
        };

        if !envelope.is_success() {
            log::error!(
                "BingX {}: exchange error {}: {}",
                endpoint,
                envelope.code,
                envelope.message()
            );
            return AttemptOutcome::Fatal(ApiError::ExchangeError {
                code: envelope.code.to_string(),
                message: envelope.message(),
            });
        }

        match envelope.data {
            Some(data) => AttemptOutcome::Success(data),
            None => AttemptOutcome::Fatal(ApiError::ParseError(format!(
                "{}: response data is empty",
                endpoint
            ))),
        }
    }

    async fn get<T>(&self, endpoint: &str, params: Vec<(&str, String)>) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send,
    {
        let params = params.as_slice();
        let label = format!("BingX {}", endpoint);
        self.retry
            .execute(&label, move || self.attempt(endpoint, params))
            .await
    }

    fn history_params(range: TimeRange) -> Vec<(&'static str, String)> {
        vec![
            ("startTime", range.start_ms.to_string()),
            ("endTime", range.inclusive_end().to_string()),
            ("limit", MAX_HISTORY_LIMIT.to_string()),
        ]
    }

    fn warn_if_truncated(endpoint: &str, range: TimeRange, returned: usize) {
        if returned >= MAX_HISTORY_LIMIT {
            log::warn!(
                "BingX {}: window [{}, {}) returned a full page of {} records; older records in it may be missing",
                endpoint,
                range.start_ms,
                range.end_ms,
                returned
            );
        }
    }
}

#[async_trait]
impl ExchangeClient for BingxClient {
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
        let data: SpotBalanceData = self.get(SPOT_BALANCE_ENDPOINT, Vec::new()).await?;
        Ok(mapper::map_spot_balances(data, chrono::Utc::now()))
    }

    async fn fetch_futures_balances(&self) -> Result<Vec<FuturesBalance>, ApiError> {
        let data: SwapBalanceData = self.get(SWAP_BALANCE_ENDPOINT, Vec::new()).await?;
        Ok(mapper::map_swap_balances(data, chrono::Utc::now()))
    }

    async fn fetch_spot_trades(&self, range: TimeRange) -> Result<Vec<Trade>, ApiError> {
        let data: SpotOrdersData = self
            .get(SPOT_ORDERS_ENDPOINT, Self::history_params(range))
            .await?;
        Self::warn_if_truncated(SPOT_ORDERS_ENDPOINT, range, data.orders.len());

        Ok(data.orders.iter().map(mapper::map_spot_order).collect())
    }

    async fn fetch_futures_trades(&self, range: TimeRange) -> Result<Vec<FuturesTrade>, ApiError> {
        let data: SwapOrdersData = self
            .get(SWAP_ORDERS_ENDPOINT, Self::history_params(range))
            .await?;
        Self::warn_if_truncated(SWAP_ORDERS_ENDPOINT, range, data.orders.len());

        let mut trades = Vec::with_capacity(data.orders.len());
        for order in &data.orders {
            match mapper::map_swap_order(order) {
                Ok(trade) => trades.push(trade),
                Err(e) => log::error!("BingX: skipping order {}: {}", order.order_id.as_string(), e),
            }
        }
        Ok(trades)
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>, ApiError> {
        let data: Vec<SwapPosition> = self.get(POSITIONS_ENDPOINT, Vec::new()).await?;

        let mut positions = Vec::new();
        for raw in &data {
            match mapper::map_position(raw) {
                Ok(Some(position)) => positions.push(position),
                Ok(None) => {}
                Err(e) => log::error!("BingX: skipping position {}: {}", raw.symbol, e),
            }
        }
        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_server::{CannedResponse, TestServer};
    use crate::models::PositionSide;

    fn settings(base_url: &str) -> ExchangeSettings {
        ExchangeSettings {
            api_key: "test-key".to_string(),
            secret_key: "test-secret".to_string(),
            base_url: base_url.to_string(),
            recv_window_ms: None,
        }
    }

    fn fast_limits() -> RateLimitSettings {
        RateLimitSettings {
            bingx_requests_per_second: 1000.0,
            bybit_requests_per_second: 1000.0,
            retry_attempts: 3,
            retry_delay_seconds: 0,
            default_retry_after_seconds: 0,
            max_rate_limit_waits: 3,
            request_timeout_seconds: 5,
        }
    }

    async fn client_for(responses: Vec<CannedResponse>) -> (BingxClient, TestServer) {
        let server = TestServer::start(responses).await;
        let client = BingxClient::new(&settings(&server.base_url), &fast_limits()).unwrap();
        (client, server)
    }

    #[test]
    fn test_placeholder_credentials_are_rejected() {
        let placeholder = ExchangeSettings {
            api_key: "your-bingx-api-key".to_string(),
            secret_key: "your-bingx-secret-key".to_string(),
            ..ExchangeSettings::default()
        };
        assert!(matches!(
            BingxClient::new(&placeholder, &fast_limits()),
            Err(ApiError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_spot_balance_request_is_signed() {
        let (client, server) = client_for(vec![CannedResponse::json(
            200,
            r#"{"code":0,"msg":"","data":{"balances":[
                {"asset":"BTC","free":"0.5","locked":"0"},
                {"asset":"ETH","free":"0","locked":"0"}]}}"#,
        )])
        .await;

        let balances = client.get_spot_balances().await;
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].asset, "BTC");
        assert_eq!(balances[0].available, 0.5);
        assert_eq!(balances[0].exchange, "BingX");

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.path(), SPOT_BALANCE_ENDPOINT);
        assert_eq!(request.header(API_KEY_HEADER), Some("test-key"));
        assert!(request.query_param("timestamp").is_some());

        // The signature covers everything before it
        let (signed, signature) = request.query().rsplit_once("&signature=").unwrap();
        assert_eq!(signature, sign_bingx(signed, "test-secret"));
    }

    #[tokio::test]
    async fn test_history_window_parameters() {
        let (client, server) = client_for(vec![CannedResponse::json(
            200,
            r#"{"code":0,"data":{"orders":[{"symbol":"BTC-USDT","orderId":"7","side":"BUY",
                "positionSide":"LONG","origQty":"1","executedQty":"1","avgPrice":"100","time":1500}]}}"#,
        )])
        .await;

        let trades = client
            .fetch_futures_trades(TimeRange::new(1_000, 2_000))
            .await
            .unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].position_side, PositionSide::Long);

        let request = &server.requests()[0];
        assert_eq!(request.path(), SWAP_ORDERS_ENDPOINT);
        assert_eq!(request.query_param("startTime"), Some("1000"));
        assert_eq!(request.query_param("endTime"), Some("1999"));
        assert_eq!(request.query_param("limit"), Some("1000"));
    }

    #[tokio::test]
    async fn test_rate_limited_then_success() {
        let (client, server) = client_for(vec![
            CannedResponse::json(429, "{}").with_header("Retry-After", "0"),
            CannedResponse::json(200, r#"{"code":0,"data":[]}"#),
        ])
        .await;

        let positions = client.fetch_positions().await.unwrap();
        assert!(positions.is_empty());
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_attempts() {
        let (client, server) = client_for(vec![
            CannedResponse::json(502, "bad gateway"),
            CannedResponse::json(502, "bad gateway"),
            CannedResponse::json(502, "bad gateway"),
        ])
        .await;

        let result = client.fetch_spot_balances().await;
        assert!(matches!(result, Err(ApiError::HttpStatus { status: 502, .. })));
        assert_eq!(server.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let (client, server) = client_for(vec![CannedResponse::json(401, r#"{"msg":"bad key"}"#)]).await;

        assert!(client.get_futures_balances().await.is_empty());
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_exchange_error_code_is_fatal() {
        let (client, server) = client_for(vec![CannedResponse::json(
            200,
            r#"{"code":100001,"msg":"signature verification failed"}"#,
        )])
        .await;

        let result = client.fetch_positions().await;
        match result {
            Err(ApiError::ExchangeError { code, message }) => {
                assert_eq!(code, "100001");
                assert_eq!(message, "signature verification failed");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_yields_empty_list() {
        let (client, server) = client_for(vec![CannedResponse::json(200, "<html>maintenance</html>")]).await;

        assert!(client.get_spot_balances().await.is_empty());
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_positions_skip_unknown_side_and_closed() {
        let (client, _server) = client_for(vec![CannedResponse::json(
            200,
            r#"{"code":0,"data":[
                {"symbol":"BTC-USDT","positionSide":"LONG","positionAmt":"0.01","leverage":10},
                {"symbol":"ETH-USDT","positionSide":"LONG","positionAmt":"0"},
                {"symbol":"SOL-USDT","positionSide":"FLAT","positionAmt":"3"},
                {"symbol":"XRP-USDT","positionSide":"BOTH","positionAmt":"-50"}]}"#,
        )])
        .await;

        let positions = client.get_positions().await;
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].symbol, "BTC-USDT");
        assert_eq!(positions[0].leverage, 10.0);
        assert_eq!(positions[1].position_side, PositionSide::Short);
        assert_eq!(positions[1].position_size, 50.0);
    }
}
