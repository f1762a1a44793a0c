//! Alpaca market data (v2 stock bars) provider.

pub mod params;
pub mod provider;
pub mod response;
