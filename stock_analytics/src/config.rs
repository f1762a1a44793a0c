//! Dashboard configuration: parsing, normalization, and loading.
//!
//! The TOML file describes which provider serves history, which symbols the
//! dashboard offers, how far back the default window reaches and where the
//! offline artifacts (price model, forecast table) live. Every field has a
//! default, so an empty file is a valid configuration.
//!
//! ```toml
//! provider = "yahoo"
//! symbols = ["aapl"]
//! lookback_days = 1816
//! earliest_date = "2015-01-02"
//! requests_per_minute = 60
//! model_path = "models/close_linreg.json"
//! forecast_path = "data/data_forecast_arima.csv"
//! ```
//!
//! Entrypoints:
//! - Parse + normalize from a TOML string: [`load_config_str`]
//! - Parse + normalize from a file path: [`load_config_path`]
//! - Environment overrides: [`apply_env_overrides`]

use std::{collections::HashSet, mem, num::NonZeroU32, path::PathBuf};

use anyhow::{Context, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared_utils::env::get_env_override;
use stock_history::providers::{ProviderId, throttle::DEFAULT_REQUESTS_PER_MINUTE};
use toml::from_str;
use tracing::debug;

/// Overrides [`DashboardConfig::provider`] when set.
pub const PROVIDER_ENV: &str = "STOCK_DASHBOARD_PROVIDER";

/// Days between the default window start and today.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 1816;

/// Top-level dashboard configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    /// History provider.
    pub provider: ProviderId,
    /// Symbols offered in the selector. Normalized to trimmed, uppercase, unique values.
    pub symbols: Vec<String>,
    /// Length of the default window in calendar days.
    pub lookback_days: u32,
    /// Ranges ending before this date are rejected without asking the provider.
    pub earliest_date: Option<NaiveDate>,
    /// Cap on outgoing provider requests.
    pub requests_per_minute: NonZeroU32,
    /// Serialized linear regression used by `predict`.
    pub model_path: Option<PathBuf>,
    /// CSV with the precomputed ARIMA forecast.
    pub forecast_path: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            provider: ProviderId::default(),
            symbols: vec!["AAPL".to_string()],
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            earliest_date: None,
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            model_path: None,
            forecast_path: None,
        }
    }
}

/// Summary of changes performed during normalization.
#[derive(Debug, Default)]
pub struct NormalizationReport {
    /// Symbols that changed when trimming or uppercasing.
    pub symbols_rewritten: usize,
    /// Duplicate symbols removed after normalization.
    pub symbols_deduped: usize,
}

/// Normalize a configuration in place.
///
/// - Trim and uppercase symbols; drop duplicates keeping the first occurrence
/// - Require at least one symbol and a positive lookback
///
/// Errors:
/// - Empty symbol after trimming
/// - Empty symbol list
/// - `lookback_days = 0`
pub fn normalize_config(cfg: &mut DashboardConfig) -> anyhow::Result<NormalizationReport> {
    let mut report = NormalizationReport::default();

    let mut seen = HashSet::new();
    let mut symbols = Vec::with_capacity(cfg.symbols.len());
    for raw in mem::take(&mut cfg.symbols) {
        let symbol = raw.trim().to_uppercase();
        if symbol.is_empty() {
            bail!("symbol cannot be empty after trimming");
        }
        if symbol != raw {
            report.symbols_rewritten += 1;
        }
        if seen.insert(symbol.clone()) {
            symbols.push(symbol);
        } else {
            report.symbols_deduped += 1;
        }
    }
    if symbols.is_empty() {
        bail!("at least one symbol must be configured");
    }
    cfg.symbols = symbols;

    if cfg.lookback_days == 0 {
        bail!("lookback_days must be positive");
    }
    Ok(report)
}

/// Parse and normalize a configuration from a TOML string.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<DashboardConfig> {
    let mut cfg: DashboardConfig = from_str(toml_str).context("failed to parse config TOML")?;
    let report = normalize_config(&mut cfg).context("normalize_config failed")?;
    debug!(?report, "config normalized");
    Ok(cfg)
}

/// Read a configuration file from disk, parse, and normalize it.
pub fn load_config_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<DashboardConfig> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    load_config_str(&text)
}

/// Applies [`PROVIDER_ENV`] on top of `cfg`.
pub fn apply_env_overrides(mut cfg: DashboardConfig) -> anyhow::Result<DashboardConfig> {
    if let Some(provider) = get_env_override::<ProviderId>(PROVIDER_ENV)? {
        debug!(%provider, "provider overridden from environment");
        cfg.provider = provider;
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = load_config_str("").unwrap();
        assert_eq!(cfg, DashboardConfig::default());
        assert_eq!(cfg.lookback_days, 1816);
        assert_eq!(cfg.requests_per_minute.get(), 60);
        assert_eq!(cfg.provider, ProviderId::Yahoo);
    }

    #[test]
    fn symbols_are_normalized() {
        let cfg = load_config_str(
            r#"
            provider = "alpaca"
            symbols = [" aapl", "MSFT", "AAPL "]
            earliest_date = "2015-01-02"
            model_path = "models/close.json"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.provider, ProviderId::Alpaca);
        assert_eq!(cfg.symbols, ["AAPL", "MSFT"]);
        assert_eq!(cfg.earliest_date, NaiveDate::from_ymd_opt(2015, 1, 2));
        assert_eq!(cfg.model_path, Some(PathBuf::from("models/close.json")));
    }

    #[test]
    fn report_counts_changes() {
        let mut cfg = DashboardConfig {
            symbols: vec!["aapl".into(), "AAPL".into(), "MSFT".into()],
            ..Default::default()
        };
        let report = normalize_config(&mut cfg).unwrap();
        assert_eq!(report.symbols_rewritten, 1);
        assert_eq!(report.symbols_deduped, 1);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(load_config_str("symbols = []").is_err());
        assert!(load_config_str(r#"symbols = ["  "]"#).is_err());
        assert!(load_config_str("lookback_days = 0").is_err());
        assert!(load_config_str("requests_per_minute = 0").is_err());
        assert!(load_config_str(r#"provider = "bloomberg""#).is_err());
        assert!(load_config_str("colour = 1").is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.toml");
        let err = load_config_path(&path).unwrap_err();
        assert!(format!("{err:#}").contains("dashboard.toml"));

        std::fs::write(&path, "symbols = [\"nvda\"]\n").unwrap();
        assert_eq!(load_config_path(&path).unwrap().symbols, ["NVDA"]);
    }

    #[test]
    #[serial]
    fn env_overrides_provider() {
        unsafe { std::env::set_var(PROVIDER_ENV, "Alpaca") };
        let cfg = apply_env_overrides(DashboardConfig::default());
        unsafe { std::env::remove_var(PROVIDER_ENV) };
        assert_eq!(cfg.unwrap().provider, ProviderId::Alpaca);
    }

    #[test]
    #[serial]
    fn bad_env_override_is_an_error() {
        unsafe { std::env::set_var(PROVIDER_ENV, "nope") };
        let cfg = apply_env_overrides(DashboardConfig::default());
        unsafe { std::env::remove_var(PROVIDER_ENV) };
        assert!(cfg.is_err());
    }
}
