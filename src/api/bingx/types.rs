//! BingX wire types.
//!
//! Bodies go through [`crate::api::wire::decode`], which lower-cases every
//! key first, so all renames below are lower-case.

use serde::Deserialize;

use crate::api::wire::{OneOrMany, WireValue};

/// BingX API response envelope `{code, msg, data, timestamp}`
#[derive(Debug, Clone, Deserialize)]
pub struct BingxResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    pub data: Option<T>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl<T> BingxResponse<T> {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    pub fn message(&self) -> String {
        self.msg.clone().unwrap_or_default()
    }
}

/// `GET /openApi/spot/v1/account/balance`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpotBalanceData {
    pub balances: Vec<SpotAsset>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpotAsset {
    pub asset: String,
    pub free: WireValue,
    pub locked: WireValue,
}

/// `GET /openApi/swap/v2/user/balance`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SwapBalanceData {
    /// An object on v2, a list on newer revisions
    pub balance: Option<OneOrMany<SwapBalance>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SwapBalance {
    pub asset: String,
    pub balance: WireValue,
    pub equity: WireValue,
    #[serde(rename = "unrealizedprofit")]
    pub unrealized_profit: WireValue,
    #[serde(rename = "availablemargin")]
    pub available_margin: WireValue,
    #[serde(rename = "maxwithdrawamount")]
    pub max_withdraw_amount: WireValue,
    #[serde(rename = "usedmargin")]
    pub used_margin: WireValue,
}

/// `GET /openApi/spot/v1/trade/historyOrders`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpotOrdersData {
    pub orders: Vec<SpotOrder>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpotOrder {
    pub symbol: String,
    #[serde(rename = "orderid")]
    pub order_id: WireValue,
    pub price: WireValue,
    #[serde(rename = "origqty")]
    pub orig_qty: WireValue,
    #[serde(rename = "executedqty")]
    pub executed_qty: WireValue,
    #[serde(rename = "cummulativequoteqty")]
    pub cummulative_quote_qty: WireValue,
    pub status: WireValue,
    #[serde(rename = "type")]
    pub order_type: WireValue,
    pub side: WireValue,
    #[serde(rename = "timeinforce")]
    pub time_in_force: WireValue,
    pub time: WireValue,
    #[serde(rename = "updatetime")]
    pub update_time: WireValue,
    pub fee: WireValue,
    #[serde(rename = "feeasset")]
    pub fee_asset: WireValue,
}

/// `GET /openApi/swap/v2/trade/allOrders`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SwapOrdersData {
    pub orders: Vec<SwapOrder>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SwapOrder {
    pub symbol: String,
    #[serde(rename = "orderid")]
    pub order_id: WireValue,
    pub side: WireValue,
    /// "LONG", "SHORT", or "BOTH" in one-way mode
    #[serde(rename = "positionside")]
    pub position_side: WireValue,
    #[serde(rename = "type")]
    pub order_type: WireValue,
    #[serde(rename = "origqty")]
    pub orig_qty: WireValue,
    pub price: WireValue,
    #[serde(rename = "executedqty")]
    pub executed_qty: WireValue,
    #[serde(rename = "avgprice")]
    pub avg_price: WireValue,
    #[serde(rename = "cumquote")]
    pub cum_quote: WireValue,
    #[serde(rename = "stopprice")]
    pub stop_price: WireValue,
    pub profit: WireValue,
    pub commission: WireValue,
    pub status: WireValue,
    #[serde(rename = "timeinforce")]
    pub time_in_force: WireValue,
    pub time: WireValue,
    #[serde(rename = "updatetime")]
    pub update_time: WireValue,
    #[serde(rename = "clientorderid")]
    pub client_order_id: WireValue,
    /// e.g. "20X"
    pub leverage: WireValue,
    #[serde(rename = "workingtype")]
    pub working_type: WireValue,
    #[serde(rename = "reduceonly")]
    pub reduce_only: WireValue,
}

/// `GET /openApi/swap/v2/user/positions` (data is a bare list)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SwapPosition {
    pub symbol: String,
    #[serde(rename = "positionid")]
    pub position_id: WireValue,
    #[serde(rename = "positionside")]
    pub position_side: WireValue,
    pub isolated: WireValue,
    /// Signed in one-way mode
    #[serde(rename = "positionamt")]
    pub position_amt: WireValue,
    #[serde(rename = "unrealizedprofit")]
    pub unrealized_profit: WireValue,
    #[serde(rename = "initialmargin")]
    pub initial_margin: WireValue,
    #[serde(rename = "avgprice")]
    pub avg_price: WireValue,
    #[serde(rename = "markprice")]
    pub mark_price: WireValue,
    pub leverage: WireValue,
    #[serde(rename = "updatetime")]
    pub update_time: WireValue,
}
