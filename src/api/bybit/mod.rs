pub mod client;
pub mod mapper;
pub mod types;

pub use client::BybitClient;

pub const EXCHANGE_NAME: &str = "Bybit";
