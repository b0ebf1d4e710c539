pub mod api;
pub mod models;
pub mod report;
pub mod sync;

use anyhow::Context;
use std::path::PathBuf;

use crate::models::Settings;
use crate::report::CsvReportWriter;
use crate::sync::{ExchangeStatus, PortfolioAggregator, PortfolioReport};

/// Per-invocation overrides on top of the settings file
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_path: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub lookback_days: Option<u32>,
    pub write_report: bool,
}

/// Load settings, collect from every exchange and write the CSV report.
///
/// Returning `Ok` with an empty report is normal when nothing is configured;
/// errors are reserved for unreadable settings or an unwritable report.
pub async fn run(options: RunOptions) -> anyhow::Result<PortfolioReport> {
    let mut settings = Settings::load(&options.config_path)
        .with_context(|| format!("loading settings from {}", options.config_path.display()))?;
    settings.apply_env_overrides();

    if let Some(days) = options.lookback_days {
        settings.history.lookback_days = days;
    }

    let aggregator = PortfolioAggregator::from_settings(&settings);
    let report = aggregator.process_all().await;

    for (exchange, status) in &report.statuses {
        match status {
            ExchangeStatus::Completed { records } => log::info!("{}: {} record(s) collected", exchange, records),
            ExchangeStatus::NotConfigured => log::info!("{}: not configured", exchange),
            ExchangeStatus::Failed { error } => log::warn!("{}: failed: {}", exchange, error),
        }
    }

    if options.write_report {
        let output_dir = options
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&settings.report.output_dir));
        CsvReportWriter::new(&output_dir)
            .write(&report)
            .with_context(|| format!("writing report to {}", output_dir.display()))?;
    }

    Ok(report)
}
