use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use portfolio_sync_lib::{run, RunOptions};

/// Collect balances, trade history and open positions from BingX and Bybit
#[derive(Parser)]
#[command(name = "portfolio-sync")]
#[command(version)]
struct Cli {
    /// Settings file
    #[arg(long, default_value = "appsettings.json")]
    config: PathBuf,

    /// Report directory (defaults to `report.output_dir` from the settings)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Override the trade-history lookback
    #[arg(long)]
    lookback_days: Option<u32>,

    /// Collect and log only; skip the CSV report
    #[arg(long)]
    no_report: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let report = run(RunOptions {
        config_path: cli.config,
        output_dir: cli.output,
        lookback_days: cli.lookback_days,
        write_report: !cli.no_report,
    })
    .await?;

    if report.is_empty() {
        log::warn!("Run finished without data; check the API credentials in the settings file");
    } else {
        log::info!(
            "Run finished: {} spot balance(s), {} futures balance(s), {} spot trade(s), {} futures trade(s), {} position(s)",
            report.spot_balances.len(),
            report.futures_balances.len(),
            report.spot_trades.len(),
            report.futures_trades.len(),
            report.positions.len()
        );
    }

    Ok(())
}
