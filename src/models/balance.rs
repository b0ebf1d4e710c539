use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Spot wallet balance for one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub available: f64,
    pub locked: f64,
    pub usd_value: Option<f64>,
    pub exchange: String,
    pub timestamp: DateTime<Utc>,
}

impl Balance {
    pub fn total(&self) -> f64 {
        self.available + self.locked
    }

    /// Zero rows carry no information for the report and are dropped by the mappers.
    pub fn is_empty(&self) -> bool {
        self.total().abs() < f64::EPSILON
    }
}

/// Futures (derivatives) account balance for one margin asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuturesBalance {
    pub asset: String,
    pub balance: f64,
    pub available_balance: f64,
    pub cross_unrealized_pnl: f64,
    pub max_withdraw_amount: f64,
    pub exchange: String,
    pub timestamp: DateTime<Utc>,
}

impl FuturesBalance {
    pub fn is_empty(&self) -> bool {
        self.balance.abs() < f64::EPSILON && self.cross_unrealized_pnl.abs() < f64::EPSILON
    }
}
