pub mod bingx;
pub mod bybit;
pub mod chunked;
pub mod client;
pub mod clock_skew;
pub mod error;
pub mod rate_limiter;
pub mod retry;
pub mod signature;
pub mod transport;
pub mod wire;

#[cfg(test)]
pub(crate) mod test_server;

pub use bingx::BingxClient;
pub use bybit::BybitClient;
pub use chunked::ChunkedHistoryFetcher;
pub use client::{ExchangeClient, RateLimitConfig, TimeRange};
pub use clock_skew::ClockSkewCompensator;
pub use error::ApiError;
pub use rate_limiter::RateLimiter;
pub use retry::{RetryExecutor, RetryPolicy};
