//! Bybit V5 wire types (keys lower-cased by [`crate::api::wire::decode`]).

use serde::Deserialize;

use crate::api::wire::WireValue;

/// V5 envelope `{retCode, retMsg, result, time}`
#[derive(Debug, Clone, Deserialize)]
pub struct BybitResponse<T> {
    #[serde(rename = "retcode")]
    pub ret_code: i64,
    #[serde(rename = "retmsg", default)]
    pub ret_msg: String,
    pub result: Option<T>,
    #[serde(default)]
    pub time: Option<i64>,
}

impl<T> BybitResponse<T> {
    pub fn is_success(&self) -> bool {
        self.ret_code == 0
    }
}

/// Cursor-paginated `result` body shared by the list endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct PagedList<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
    #[serde(rename = "nextpagecursor", default)]
    pub next_page_cursor: WireValue,
}

impl<T> PagedList<T> {
    pub fn next_cursor(&self) -> Option<String> {
        self.next_page_cursor.as_opt_string()
    }
}

/// `GET /v5/account/wallet-balance`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WalletBalanceResult {
    pub list: Vec<WalletAccount>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WalletAccount {
    #[serde(rename = "accounttype")]
    pub account_type: WireValue,
    #[serde(rename = "totalequity")]
    pub total_equity: WireValue,
    #[serde(rename = "totalwalletbalance")]
    pub total_wallet_balance: WireValue,
    #[serde(rename = "totalavailablebalance")]
    pub total_available_balance: WireValue,
    #[serde(rename = "totalperpupl")]
    pub total_perp_upl: WireValue,
    pub coin: Vec<WalletCoin>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WalletCoin {
    pub coin: String,
    pub equity: WireValue,
    #[serde(rename = "walletbalance")]
    pub wallet_balance: WireValue,
    pub locked: WireValue,
    #[serde(rename = "usdvalue")]
    pub usd_value: WireValue,
    #[serde(rename = "unrealisedpnl")]
    pub unrealised_pnl: WireValue,
    /// Blank on some unified accounts
    #[serde(rename = "availabletowithdraw")]
    pub available_to_withdraw: WireValue,
    #[serde(rename = "totalpositionim")]
    pub total_position_im: WireValue,
    #[serde(rename = "totalorderim")]
    pub total_order_im: WireValue,
}

/// `GET /v5/execution/list` entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Execution {
    pub symbol: String,
    #[serde(rename = "orderid")]
    pub order_id: WireValue,
    #[serde(rename = "execid")]
    pub exec_id: WireValue,
    pub side: WireValue,
    #[serde(rename = "ordertype")]
    pub order_type: WireValue,
    #[serde(rename = "orderqty")]
    pub order_qty: WireValue,
    #[serde(rename = "orderprice")]
    pub order_price: WireValue,
    #[serde(rename = "execqty")]
    pub exec_qty: WireValue,
    #[serde(rename = "execprice")]
    pub exec_price: WireValue,
    #[serde(rename = "execvalue")]
    pub exec_value: WireValue,
    #[serde(rename = "execfee")]
    pub exec_fee: WireValue,
    #[serde(rename = "feecurrency")]
    pub fee_currency: WireValue,
    #[serde(rename = "exectime")]
    pub exec_time: WireValue,
}

/// `GET /v5/order/history` entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderRecord {
    pub symbol: String,
    #[serde(rename = "orderid")]
    pub order_id: WireValue,
    #[serde(rename = "orderlinkid")]
    pub order_link_id: WireValue,
    pub side: WireValue,
    /// 0 one-way, 1 hedge-mode long, 2 hedge-mode short
    #[serde(rename = "positionidx")]
    pub position_idx: WireValue,
    #[serde(rename = "ordertype")]
    pub order_type: WireValue,
    pub qty: WireValue,
    pub price: WireValue,
    #[serde(rename = "avgprice")]
    pub avg_price: WireValue,
    #[serde(rename = "cumexecqty")]
    pub cum_exec_qty: WireValue,
    #[serde(rename = "cumexecvalue")]
    pub cum_exec_value: WireValue,
    #[serde(rename = "cumexecfee")]
    pub cum_exec_fee: WireValue,
    #[serde(rename = "orderstatus")]
    pub order_status: WireValue,
    #[serde(rename = "timeinforce")]
    pub time_in_force: WireValue,
    #[serde(rename = "triggerprice")]
    pub trigger_price: WireValue,
    #[serde(rename = "triggerby")]
    pub trigger_by: WireValue,
    #[serde(rename = "reduceonly")]
    pub reduce_only: WireValue,
    #[serde(rename = "createdtime")]
    pub created_time: WireValue,
    #[serde(rename = "updatedtime")]
    pub updated_time: WireValue,
}

/// `GET /v5/position/closed-pnl` entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClosedPnlRecord {
    pub symbol: String,
    #[serde(rename = "orderid")]
    pub order_id: WireValue,
    /// Side of the order that closed the position
    pub side: WireValue,
    pub qty: WireValue,
    #[serde(rename = "orderprice")]
    pub order_price: WireValue,
    #[serde(rename = "ordertype")]
    pub order_type: WireValue,
    #[serde(rename = "closedsize")]
    pub closed_size: WireValue,
    #[serde(rename = "cumentryvalue")]
    pub cum_entry_value: WireValue,
    #[serde(rename = "avgentryprice")]
    pub avg_entry_price: WireValue,
    #[serde(rename = "cumexitvalue")]
    pub cum_exit_value: WireValue,
    #[serde(rename = "avgexitprice")]
    pub avg_exit_price: WireValue,
    #[serde(rename = "closedpnl")]
    pub closed_pnl: WireValue,
    pub leverage: WireValue,
    #[serde(rename = "createdtime")]
    pub created_time: WireValue,
    #[serde(rename = "updatedtime")]
    pub updated_time: WireValue,
}

/// `GET /v5/position/list` entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PositionRecord {
    pub symbol: String,
    /// "Buy", "Sell", or empty once the position is closed
    pub side: WireValue,
    pub size: WireValue,
    #[serde(rename = "avgprice")]
    pub avg_price: WireValue,
    #[serde(rename = "markprice")]
    pub mark_price: WireValue,
    #[serde(rename = "unrealisedpnl")]
    pub unrealised_pnl: WireValue,
    pub leverage: WireValue,
    /// 0 cross margin, 1 isolated margin
    #[serde(rename = "trademode")]
    pub trade_mode: WireValue,
    #[serde(rename = "positionim")]
    pub position_im: WireValue,
    #[serde(rename = "positionidx")]
    pub position_idx: WireValue,
    #[serde(rename = "updatedtime")]
    pub updated_time: WireValue,
}
