use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Positions smaller than this (in contracts/base units) are treated as closed.
pub const POSITION_EPSILON: f64 = 1e-6;

/// Direction of an open futures position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "Long",
            PositionSide::Short => "Short",
        }
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when an endpoint reports a side value its table does not know.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized position side {value:?} from {endpoint}")]
pub struct UnknownPositionSide {
    pub endpoint: &'static str,
    pub value: String,
}

/// Named lookup table translating one endpoint's side encoding.
///
/// Each exchange endpoint gets its own table because the same raw value can
/// mean opposite things depending on where it comes from (an order's own side
/// versus the side of the order that closed a position).
#[derive(Debug, Clone, Copy)]
pub struct SideTable {
    pub endpoint: &'static str,
    pub entries: &'static [(&'static str, PositionSide)],
}

impl SideTable {
    pub const fn new(endpoint: &'static str, entries: &'static [(&'static str, PositionSide)]) -> Self {
        Self { endpoint, entries }
    }

    /// Decode a raw side value. Matching ignores ASCII case and surrounding whitespace.
    pub fn decode(&self, raw: &str) -> Result<PositionSide, UnknownPositionSide> {
        let raw = raw.trim();
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(raw))
            .map(|(_, side)| *side)
            .ok_or_else(|| UnknownPositionSide {
                endpoint: self.endpoint,
                value: raw.to_string(),
            })
    }
}

/// An open futures position, normalized across exchanges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub position_side: PositionSide,
    /// Absolute size; direction lives in `position_side`
    pub position_size: f64,
    pub entry_price: f64,
    pub mark_price: f64,
    pub unrealized_pnl: f64,
    pub leverage: f64,
    pub isolated_margin: f64,
    pub update_time_ms: i64,
    pub exchange: String,
}

/// True when a raw (possibly signed) size is large enough to be a real position.
pub fn is_open_size(size: f64) -> bool {
    size.is_finite() && size.abs() >= POSITION_EPSILON
}
