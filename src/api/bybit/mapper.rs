use chrono::{DateTime, Utc};

use super::types::{ClosedPnlRecord, Execution, OrderRecord, PositionRecord, WalletBalanceResult};
use super::EXCHANGE_NAME;
use crate::models::{
    is_open_size, Balance, FuturesBalance, FuturesTrade, Position, PositionSide, SideTable, Trade,
    TradeSource, UnknownPositionSide,
};

const SETTLE_COIN: &str = "USDT";
const ISOLATED_TRADE_MODE: i64 = 1;

/// `/v5/position/list` `side`: the position's own direction
pub const POSITION_LIST_SIDE: SideTable = SideTable::new(
    "bybit/position/list.side",
    &[("Buy", PositionSide::Long), ("Sell", PositionSide::Short)],
);

/// `/v5/order/history` `side` for one-way (`positionIdx = 0`) orders
pub const ORDER_HISTORY_SIDE: SideTable = SideTable::new(
    "bybit/order/history.side",
    &[("Buy", PositionSide::Long), ("Sell", PositionSide::Short)],
);

/// `/v5/order/history` hedge-mode `positionIdx`
pub const ORDER_POSITION_INDEX: SideTable = SideTable::new(
    "bybit/order/history.positionIdx",
    &[("1", PositionSide::Long), ("2", PositionSide::Short)],
);

/// `/v5/position/closed-pnl` `side` is the closing order's side, so it is inverted.
pub const CLOSED_PNL_SIDE: SideTable = SideTable::new(
    "bybit/position/closed-pnl.side",
    &[("Sell", PositionSide::Long), ("Buy", PositionSide::Short)],
);

/// `/v5/execution/list?category=linear` `side`, read as the closing order's side like closed PnL
pub const LINEAR_EXECUTION_SIDE: SideTable = SideTable::new(
    "bybit/execution/list.side",
    &[("Sell", PositionSide::Long), ("Buy", PositionSide::Short)],
);

const ONE_WAY_INDEX: &str = "0";

/// Unified-account coins as spot balances. The locked part is carved out of
/// the wallet balance; empty coins are dropped.
pub fn map_spot_balances(result: &WalletBalanceResult, now: DateTime<Utc>) -> Vec<Balance> {
    result
        .list
        .iter()
        .flat_map(|account| account.coin.iter())
        .map(|coin| {
            let wallet = coin.wallet_balance.as_f64_or_zero();
            let locked = coin.locked.as_f64_or_zero();
            Balance {
                asset: coin.coin.clone(),
                available: (wallet - locked).max(0.0),
                locked,
                usd_value: coin.usd_value.as_opt_f64(),
                exchange: EXCHANGE_NAME.to_string(),
                timestamp: now,
            }
        })
        .filter(|balance| !balance.is_empty())
        .collect()
}

/// The same coins seen as derivatives margin
pub fn map_futures_balances(result: &WalletBalanceResult, now: DateTime<Utc>) -> Vec<FuturesBalance> {
    result
        .list
        .iter()
        .flat_map(|account| account.coin.iter())
        .map(|coin| {
            let wallet = coin.wallet_balance.as_f64_or_zero();
            let margin_in_use = coin.total_position_im.as_f64_or_zero() + coin.total_order_im.as_f64_or_zero();
            let available = (wallet - margin_in_use).max(0.0);
            FuturesBalance {
                asset: coin.coin.clone(),
                balance: wallet,
                available_balance: available,
                cross_unrealized_pnl: coin.unrealised_pnl.as_f64_or_zero(),
                max_withdraw_amount: coin.available_to_withdraw.as_opt_f64().unwrap_or(available),
                exchange: EXCHANGE_NAME.to_string(),
                timestamp: now,
            }
        })
        .filter(|balance| !balance.is_empty())
        .collect()
}

/// Spot fill from the execution list
pub fn map_execution(execution: &Execution) -> Trade {
    let exec_time = execution.exec_time.as_i64_or_zero();
    Trade {
        symbol: execution.symbol.clone(),
        order_id: execution.order_id.as_string(),
        trade_id: execution.exec_id.as_string(),
        side: execution.side.as_string(),
        order_type: execution.order_type.as_string(),
        quantity: execution.order_qty.as_f64_or_zero(),
        price: execution.exec_price.as_f64_or_zero(),
        executed_quantity: execution.exec_qty.as_f64_or_zero(),
        cumulative_quote_quantity: execution.exec_value.as_f64_or_zero(),
        status: "Filled".to_string(),
        time_in_force: String::new(),
        trade_time_ms: exec_time,
        update_time_ms: exec_time,
        fee: execution.exec_fee.as_f64_or_zero().abs(),
        fee_asset: execution.fee_currency.as_string(),
        exchange: EXCHANGE_NAME.to_string(),
    }
}

/// Linear fill. A fill has no order quantity of its own, so both quantities
/// are the executed size.
pub fn map_futures_execution(execution: &Execution) -> Result<FuturesTrade, UnknownPositionSide> {
    let position_side = LINEAR_EXECUTION_SIDE.decode(&execution.side.as_string())?;
    let exec_qty = execution.exec_qty.as_f64_or_zero();
    let exec_price = execution.exec_price.as_f64_or_zero();
    let exec_time = execution.exec_time.as_i64_or_zero();

    Ok(FuturesTrade {
        symbol: execution.symbol.clone(),
        order_id: execution.order_id.as_string(),
        trade_id: execution.exec_id.as_string(),
        side: execution.side.as_string(),
        order_type: execution.order_type.as_string(),
        quantity: exec_qty,
        price: exec_price,
        executed_quantity: exec_qty,
        cumulative_quote_quantity: execution.exec_value.as_f64_or_zero(),
        status: "Filled".to_string(),
        time_in_force: String::new(),
        trade_time_ms: exec_time,
        update_time_ms: exec_time,
        fee: execution.exec_fee.as_f64_or_zero().abs(),
        fee_asset: execution
            .fee_currency
            .as_opt_string()
            .unwrap_or_else(|| SETTLE_COIN.to_string()),
        exchange: EXCHANGE_NAME.to_string(),
        position_side,
        avg_price: exec_price,
        stop_price: None,
        realized_pnl: 0.0,
        leverage: None,
        reduce_only: None,
        working_type: None,
        client_order_id: None,
        source: TradeSource::Execution,
    })
}

/// Hedge-mode index wins; one-way orders fall back to their side.
pub fn decode_order_side(order: &OrderRecord) -> Result<PositionSide, UnknownPositionSide> {
    match order.position_idx.as_opt_string() {
        Some(index) if index != ONE_WAY_INDEX => ORDER_POSITION_INDEX.decode(&index),
        _ => ORDER_HISTORY_SIDE.decode(&order.side.as_string()),
    }
}

pub fn map_order(order: &OrderRecord) -> Result<FuturesTrade, UnknownPositionSide> {
    let position_side = decode_order_side(order)?;
    let order_id = order.order_id.as_string();

    Ok(FuturesTrade {
        symbol: order.symbol.clone(),
        trade_id: order_id.clone(),
        order_id,
        side: order.side.as_string(),
        order_type: order.order_type.as_string(),
        quantity: order.qty.as_f64_or_zero(),
        price: order.price.as_f64_or_zero(),
        executed_quantity: order.cum_exec_qty.as_f64_or_zero(),
        cumulative_quote_quantity: order.cum_exec_value.as_f64_or_zero(),
        status: order.order_status.as_string(),
        time_in_force: order.time_in_force.as_string(),
        trade_time_ms: order.created_time.as_i64_or_zero(),
        update_time_ms: order.updated_time.as_i64_or_zero(),
        fee: order.cum_exec_fee.as_f64_or_zero().abs(),
        fee_asset: SETTLE_COIN.to_string(),
        exchange: EXCHANGE_NAME.to_string(),
        position_side,
        avg_price: order.avg_price.as_f64_or_zero(),
        stop_price: order.trigger_price.as_opt_f64().filter(|price| *price != 0.0),
        realized_pnl: 0.0,
        leverage: None,
        reduce_only: order.reduce_only.as_opt_bool(),
        working_type: order.trigger_by.as_opt_string(),
        client_order_id: order.order_link_id.as_opt_string(),
        source: TradeSource::OrderHistory,
    })
}

/// Closed-PnL row. Fees are already netted into `closedPnl`.
pub fn map_closed_pnl(record: &ClosedPnlRecord) -> Result<FuturesTrade, UnknownPositionSide> {
    let position_side = CLOSED_PNL_SIDE.decode(&record.side.as_string())?;
    let order_id = record.order_id.as_string();

    Ok(FuturesTrade {
        symbol: record.symbol.clone(),
        trade_id: order_id.clone(),
        order_id,
        side: record.side.as_string(),
        order_type: record.order_type.as_string(),
        quantity: record.qty.as_f64_or_zero(),
        price: record.order_price.as_f64_or_zero(),
        executed_quantity: record.closed_size.as_f64_or_zero(),
        cumulative_quote_quantity: record.cum_exit_value.as_f64_or_zero(),
        status: "Closed".to_string(),
        time_in_force: String::new(),
        trade_time_ms: record.created_time.as_i64_or_zero(),
        update_time_ms: record.updated_time.as_i64_or_zero(),
        fee: 0.0,
        fee_asset: SETTLE_COIN.to_string(),
        exchange: EXCHANGE_NAME.to_string(),
        position_side,
        avg_price: record.avg_exit_price.as_f64_or_zero(),
        stop_price: None,
        realized_pnl: record.closed_pnl.as_f64_or_zero(),
        leverage: record.leverage.as_opt_f64(),
        reduce_only: Some(true),
        working_type: None,
        client_order_id: None,
        source: TradeSource::ClosedPnl,
    })
}

/// Open position, or `None` when the size is below the closed-position threshold.
pub fn map_position(record: &PositionRecord) -> Result<Option<Position>, UnknownPositionSide> {
    let size = record.size.as_f64_or_zero();
    if !is_open_size(size) {
        return Ok(None);
    }

    let position_side = POSITION_LIST_SIDE.decode(&record.side.as_string())?;
    let isolated = record.trade_mode.as_i64_or_zero() == ISOLATED_TRADE_MODE;

    Ok(Some(Position {
        symbol: record.symbol.clone(),
        position_side,
        position_size: size.abs(),
        entry_price: record.avg_price.as_f64_or_zero(),
        mark_price: record.mark_price.as_f64_or_zero(),
        unrealized_pnl: record.unrealised_pnl.as_f64_or_zero(),
        leverage: record.leverage.as_f64_or_zero(),
        isolated_margin: if isolated {
            record.position_im.as_f64_or_zero()
        } else {
            0.0
        },
        update_time_ms: record.updated_time.as_i64_or_zero(),
        exchange: EXCHANGE_NAME.to_string(),
    }))
}
