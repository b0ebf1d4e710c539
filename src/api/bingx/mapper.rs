use chrono::{DateTime, Utc};

use super::types::{SpotBalanceData, SpotOrder, SwapBalanceData, SwapOrder, SwapPosition};
use super::EXCHANGE_NAME;
use crate::models::{
    is_open_size, Balance, FuturesBalance, FuturesTrade, Position, PositionSide, SideTable, Trade,
    TradeSource, UnknownPositionSide,
};

/// Swap `positionSide` in hedge mode
pub const SWAP_POSITION_SIDE: SideTable = SideTable::new(
    "bingx/swap/positionSide",
    &[("LONG", PositionSide::Long), ("SHORT", PositionSide::Short)],
);

/// Swap order `side`, consulted when the order was placed in one-way mode
pub const SWAP_ORDER_SIDE: SideTable = SideTable::new(
    "bingx/swap/allOrders.side",
    &[("BUY", PositionSide::Long), ("SELL", PositionSide::Short)],
);

const ONE_WAY_MODE: &str = "BOTH";

/// Spot balances; assets with nothing free and nothing locked are dropped.
pub fn map_spot_balances(data: SpotBalanceData, now: DateTime<Utc>) -> Vec<Balance> {
    data.balances
        .into_iter()
        .map(|asset| Balance {
            asset: asset.asset,
            available: asset.free.as_f64_or_zero(),
            locked: asset.locked.as_f64_or_zero(),
            usd_value: None,
            exchange: EXCHANGE_NAME.to_string(),
            timestamp: now,
        })
        .filter(|balance| !balance.is_empty())
        .collect()
}

pub fn map_swap_balances(data: SwapBalanceData, now: DateTime<Utc>) -> Vec<FuturesBalance> {
    data.balance
        .map(|balance| balance.into_vec())
        .unwrap_or_default()
        .into_iter()
        .map(|entry| FuturesBalance {
            asset: entry.asset,
            balance: entry.balance.as_f64_or_zero(),
            available_balance: entry.available_margin.as_f64_or_zero(),
            cross_unrealized_pnl: entry.unrealized_profit.as_f64_or_zero(),
            max_withdraw_amount: entry.max_withdraw_amount.as_f64_or_zero(),
            exchange: EXCHANGE_NAME.to_string(),
            timestamp: now,
        })
        .filter(|balance| !balance.is_empty())
        .collect()
}

/// Spot history is order-level; the order id doubles as the trade id.
pub fn map_spot_order(order: &SpotOrder) -> Trade {
    let order_id = order.order_id.as_string();
    Trade {
        symbol: order.symbol.clone(),
        trade_id: order_id.clone(),
        order_id,
        side: order.side.as_string(),
        order_type: order.order_type.as_string(),
        quantity: order.orig_qty.as_f64_or_zero(),
        price: order.price.as_f64_or_zero(),
        executed_quantity: order.executed_qty.as_f64_or_zero(),
        cumulative_quote_quantity: order.cummulative_quote_qty.as_f64_or_zero(),
        status: order.status.as_string(),
        time_in_force: order.time_in_force.as_string(),
        trade_time_ms: order.time.as_i64_or_zero(),
        update_time_ms: order.update_time.as_i64_or_zero(),
        // BingX reports fees as negative amounts
        fee: order.fee.as_f64_or_zero().abs(),
        fee_asset: order.fee_asset.as_string(),
        exchange: EXCHANGE_NAME.to_string(),
    }
}

/// Hedge-mode orders carry their side in `positionSide`; one-way orders
/// (`BOTH` or blank) fall back to the order's own BUY/SELL.
pub fn decode_order_side(order: &SwapOrder) -> Result<PositionSide, UnknownPositionSide> {
    match order.position_side.as_opt_string() {
        Some(side) if !side.eq_ignore_ascii_case(ONE_WAY_MODE) => SWAP_POSITION_SIDE.decode(&side),
        _ => SWAP_ORDER_SIDE.decode(&order.side.as_string()),
    }
}

pub fn map_swap_order(order: &SwapOrder) -> Result<FuturesTrade, UnknownPositionSide> {
    let position_side = decode_order_side(order)?;
    let order_id = order.order_id.as_string();

    Ok(FuturesTrade {
        symbol: order.symbol.clone(),
        trade_id: order_id.clone(),
        order_id,
        side: order.side.as_string(),
        order_type: order.order_type.as_string(),
        quantity: order.orig_qty.as_f64_or_zero(),
        price: order.price.as_f64_or_zero(),
        executed_quantity: order.executed_qty.as_f64_or_zero(),
        cumulative_quote_quantity: order.cum_quote.as_f64_or_zero(),
        status: order.status.as_string(),
        time_in_force: order.time_in_force.as_string(),
        trade_time_ms: order.time.as_i64_or_zero(),
        update_time_ms: order.update_time.as_i64_or_zero(),
        fee: order.commission.as_f64_or_zero().abs(),
        fee_asset: quote_asset(&order.symbol),
        exchange: EXCHANGE_NAME.to_string(),
        position_side,
        avg_price: order.avg_price.as_f64_or_zero(),
        stop_price: order.stop_price.as_opt_f64().filter(|price| *price != 0.0),
        realized_pnl: order.profit.as_f64_or_zero(),
        leverage: order.leverage.as_opt_string().and_then(|text| parse_leverage(&text)),
        reduce_only: order.reduce_only.as_opt_bool(),
        working_type: order.working_type.as_opt_string(),
        client_order_id: order.client_order_id.as_opt_string(),
        source: TradeSource::OrderHistory,
    })
}

/// Open position, or `None` when the size is below the closed-position threshold.
pub fn map_position(position: &SwapPosition) -> Result<Option<Position>, UnknownPositionSide> {
    let signed_size = position.position_amt.as_f64_or_zero();
    if !is_open_size(signed_size) {
        return Ok(None);
    }

    let position_side = match position.position_side.as_opt_string() {
        Some(side) if !side.eq_ignore_ascii_case(ONE_WAY_MODE) => SWAP_POSITION_SIDE.decode(&side)?,
        _ if signed_size > 0.0 => PositionSide::Long,
        _ => PositionSide::Short,
    };

    let isolated = position.isolated.as_opt_bool().unwrap_or(false);

    Ok(Some(Position {
        symbol: position.symbol.clone(),
        position_side,
        position_size: signed_size.abs(),
        entry_price: position.avg_price.as_f64_or_zero(),
        mark_price: position.mark_price.as_f64_or_zero(),
        unrealized_pnl: position.unrealized_profit.as_f64_or_zero(),
        leverage: position.leverage.as_opt_string().and_then(|text| parse_leverage(&text)).unwrap_or(0.0),
        isolated_margin: if isolated {
            position.initial_margin.as_f64_or_zero()
        } else {
            0.0
        },
        update_time_ms: position.update_time.as_i64_or_zero(),
        exchange: EXCHANGE_NAME.to_string(),
    }))
}

/// "20X", "20x" or "20" → 20.0
pub fn parse_leverage(text: &str) -> Option<f64> {
    text.trim()
        .trim_end_matches(['X', 'x'])
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
}

/// "BTC-USDT" → "USDT"
fn quote_asset(symbol: &str) -> String {
    symbol
        .rsplit_once('-')
        .map(|(_, quote)| quote.to_string())
        .unwrap_or_else(|| "USDT".to_string())
}
