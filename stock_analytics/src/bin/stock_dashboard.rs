use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use stock_analytics::{
    chart::PlotMode,
    config::{apply_env_overrides, load_config_path},
    dashboard::Dashboard,
    features::SentimentCounts,
    forecast::ForecastTable,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Single-stock analytics dashboard")]
struct Cli {
    /// Dashboard configuration (TOML).
    #[arg(long, value_name = "FILE")]
    config: PathBuf,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Load, enrich and print a price history.
    History {
        #[arg(long)]
        symbol: String,
        /// First day (defaults to the start of the lookback window).
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day (defaults to today).
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, default_value_t = PlotMode::Returns)]
        mode: PlotMode,
        /// Print the chart series as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Predict the next close from the last bar of the selected window.
    Predict {
        #[arg(long)]
        symbol: String,
        /// First day (defaults to the start of the lookback window).
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day (defaults to today).
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        pos: i64,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        neg: i64,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        neutral: i64,
    },
    /// Print a page of the precomputed forecast.
    Forecast {
        /// Zero-based page.
        #[arg(long, default_value_t = 0)]
        page: usize,
        #[arg(long, default_value_t = 10)]
        page_size: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = apply_env_overrides(load_config_path(&cli.config)?)?;

    match cli.cmd {
        Cmd::History {
            symbol,
            start,
            end,
            mode,
            json,
        } => {
            let dashboard = Dashboard::from_config(config)?;
            let range = dashboard.select_or_default(start, end)?;
            let view = dashboard.view(&symbol, range).await?;

            if json {
                let chart = dashboard.chart(&view, mode);
                println!("{}", serde_json::to_string_pretty(&chart)?);
                return Ok(());
            }

            println!(
                "{:<10} {:>10} {:>10} {:>10} {:>10} {:>12} {:>9} {:>10} {:>10}",
                "date", "open", "high", "low", "close", "volume", "return%", "ma50", "ma200"
            );
            for row in &view.series.bars {
                println!(
                    "{:<10} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>12} {:>9.3} {:>10.2} {:>10.2}",
                    row.bar.date,
                    row.bar.open,
                    row.bar.high,
                    row.bar.low,
                    row.bar.close,
                    row.bar.volume,
                    row.simple_return * 100.0,
                    row.ma50,
                    row.ma200
                );
            }
            if let (Some(daily), Some(annual)) = (
                view.series.daily_volatility(),
                view.series.annualized_volatility(),
            ) {
                println!("daily volatility {daily:.6}, annualized {annual:.2}%");
            }
        }
        Cmd::Predict {
            symbol,
            start,
            end,
            pos,
            neg,
            neutral,
        } => {
            let sentiment = SentimentCounts::new(pos, neg, neutral)?;
            let dashboard = Dashboard::from_config(config)?;
            let range = dashboard.select_or_default(start, end)?;
            let view = dashboard.view(&symbol, range).await?;
            let prediction = dashboard.predict(&view, sentiment)?;
            info!(as_of = %prediction.as_of, "prediction ready");
            println!("Tomorrow close price: $ {}", prediction.close);
        }
        Cmd::Forecast { page, page_size } => {
            let path = config
                .forecast_path
                .context("forecast_path is not set in the config")?;
            let table = ForecastTable::load_csv(&path)?;
            println!(
                "page {} of {} ({} rows)",
                page + 1,
                table.page_count(page_size),
                table.len()
            );
            for row in table.page(page, page_size) {
                println!("{}  {:.4}", row.date, row.forecast);
            }
        }
    }

    Ok(())
}
