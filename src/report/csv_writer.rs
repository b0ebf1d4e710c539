use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::sync::PortfolioReport;

pub const SPOT_BALANCES_FILE: &str = "spot_balances.csv";
pub const FUTURES_BALANCES_FILE: &str = "futures_balances.csv";
pub const SPOT_TRADES_FILE: &str = "spot_trades.csv";
pub const FUTURES_TRADES_FILE: &str = "futures_trades.csv";
pub const POSITIONS_FILE: &str = "positions.csv";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to create report directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to flush {path}: {source}")]
    Flush {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Writes the five report collections as CSV files into one directory.
///
/// Each file gets a header row taken from the record's field names. An empty
/// collection produces an empty file, so stale rows from an earlier run never
/// survive.
pub struct CsvReportWriter {
    output_dir: PathBuf,
}

impl CsvReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every collection; returns the paths written.
    pub fn write(&self, report: &PortfolioReport) -> Result<Vec<PathBuf>, ReportError> {
        fs::create_dir_all(&self.output_dir).map_err(|source| ReportError::CreateDir {
            path: self.output_dir.display().to_string(),
            source,
        })?;

        let written = vec![
            self.write_rows(SPOT_BALANCES_FILE, &report.spot_balances)?,
            self.write_rows(FUTURES_BALANCES_FILE, &report.futures_balances)?,
            self.write_rows(SPOT_TRADES_FILE, &report.spot_trades)?,
            self.write_rows(FUTURES_TRADES_FILE, &report.futures_trades)?,
            self.write_rows(POSITIONS_FILE, &report.positions)?,
        ];

        log::info!("Report written to {}", self.output_dir.display());
        Ok(written)
    }

    fn write_rows<T: Serialize>(&self, file_name: &str, rows: &[T]) -> Result<PathBuf, ReportError> {
        let path = self.output_dir.join(file_name);
        let csv_error = |source| ReportError::Csv {
            path: path.display().to_string(),
            source,
        };

        let mut writer = csv::Writer::from_path(&path).map_err(csv_error)?;
        for row in rows {
            writer.serialize(row).map_err(csv_error)?;
        }
        writer.flush().map_err(|source| ReportError::Flush {
            path: path.display().to_string(),
            source,
        })?;

        log::debug!("Wrote {} row(s) to {}", rows.len(), path.display());
        Ok(path)
    }
}
