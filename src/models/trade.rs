use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::PositionSide;

/// Spot fill or order record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub order_id: String,
    pub trade_id: String,
    pub side: String,
    pub order_type: String,
    pub quantity: f64,
    pub price: f64,
    pub executed_quantity: f64,
    pub cumulative_quote_quantity: f64,
    pub status: String,
    pub time_in_force: String,
    pub trade_time_ms: i64,
    pub update_time_ms: i64,
    pub fee: f64,
    pub fee_asset: String,
    pub exchange: String,
}

impl Trade {
    pub fn trade_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.trade_time_ms)
    }
}

/// Which wire record a futures row was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSource {
    OrderHistory,
    Execution,
    ClosedPnl,
}

/// Futures order/fill/closed-PnL record
///
/// Fields are flat (not a nested `Trade`) so the row serializes to one CSV line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuturesTrade {
    pub symbol: String,
    pub order_id: String,
    pub trade_id: String,
    pub side: String,
    pub order_type: String,
    pub quantity: f64,
    pub price: f64,
    pub executed_quantity: f64,
    pub cumulative_quote_quantity: f64,
    pub status: String,
    pub time_in_force: String,
    pub trade_time_ms: i64,
    pub update_time_ms: i64,
    pub fee: f64,
    pub fee_asset: String,
    pub exchange: String,

    pub position_side: PositionSide,
    pub avg_price: f64,
    pub stop_price: Option<f64>,
    pub realized_pnl: f64,
    pub leverage: Option<f64>,
    pub reduce_only: Option<bool>,
    pub working_type: Option<String>,
    pub client_order_id: Option<String>,
    pub source: TradeSource,
}

impl FuturesTrade {
    pub fn trade_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.trade_time_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_trade_time_conversion() {
        let trade = Trade {
            symbol: "BTC-USDT".to_string(),
            order_id: "1".to_string(),
            trade_id: "1".to_string(),
            side: "BUY".to_string(),
            order_type: "LIMIT".to_string(),
            quantity: 1.0,
            price: 42000.0,
            executed_quantity: 1.0,
            cumulative_quote_quantity: 42000.0,
            status: "FILLED".to_string(),
            time_in_force: "GTC".to_string(),
            trade_time_ms: 1704067200000,
            update_time_ms: 1704067200000,
            fee: 0.0,
            fee_asset: "USDT".to_string(),
            exchange: "BingX".to_string(),
        };

        let time = trade.trade_time().unwrap();
        assert_eq!(time.year(), 2024);
        assert_eq!(time.month(), 1);
        assert_eq!(time.day(), 1);
    }
}
