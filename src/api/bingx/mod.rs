pub mod client;
pub mod mapper;
pub mod types;

pub use client::BingxClient;

pub const EXCHANGE_NAME: &str = "BingX";
