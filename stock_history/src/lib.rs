//! Daily price history for a single equity.
//!
//! - [`providers`]: vendor adapters behind the [`providers::DataProvider`] trait.
//! - [`models`]: the canonical [`models::bar::Bar`] and [`models::bar_series::BarSeries`].
//! - [`loader`]: [`loader::HistoryLoader`], range snapping and the per-session cache.
//! - [`errors`]: [`errors::LoadError`].

pub mod errors;
pub mod loader;
pub mod models;
pub mod providers;

pub use errors::LoadError;
pub use loader::HistoryLoader;
