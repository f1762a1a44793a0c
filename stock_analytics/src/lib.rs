//! Analytics on top of [`stock_history`]: enrichment, prediction features,
//! chart series and the dashboard session that ties them together.

#![deny(missing_docs)]

pub mod chart;
pub mod config;
pub mod dashboard;
pub mod enrich;
pub mod errors;
pub mod features;
pub mod forecast;
pub mod prediction;
