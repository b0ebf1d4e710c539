pub mod aggregator;

pub use aggregator::{
    ExchangeKind, ExchangeProcessor, ExchangeSnapshot, ExchangeStatus, PortfolioAggregator, PortfolioReport,
    ProcessOutcome,
};
