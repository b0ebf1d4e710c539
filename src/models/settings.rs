use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Credential values starting with this prefix are template placeholders, not real keys.
const PLACEHOLDER_PREFIX: &str = "your-";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Application settings loaded from `appsettings.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bingx: ExchangeSettings,
    pub bybit: ExchangeSettings,
    pub rate_limiting: RateLimitSettings,
    pub history: HistorySettings,
    pub report: ReportSettings,
}

/// Credentials and endpoint for one exchange
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeSettings {
    pub api_key: String,
    pub secret_key: String,
    /// Empty means the exchange's public production URL
    pub base_url: String,
    /// Bybit only: tolerance between request timestamp and server time
    pub recv_window_ms: Option<u64>,
}

impl ExchangeSettings {
    /// False for empty or template placeholder credentials (e.g. "your-bingx-api-key").
    pub fn is_configured(&self) -> bool {
        is_real_credential(&self.api_key) && is_real_credential(&self.secret_key)
    }

    pub fn base_url_or<'a>(&'a self, default: &'a str) -> &'a str {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            default
        } else {
            trimmed.trim_end_matches('/')
        }
    }
}

fn is_real_credential(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !value.to_ascii_lowercase().starts_with(PLACEHOLDER_PREFIX)
}

/// Pacing and retry behaviour shared by all exchange clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub bingx_requests_per_second: f64,
    pub bybit_requests_per_second: f64,
    /// Total attempts per request for generic failures (minimum 1)
    pub retry_attempts: u32,
    /// Base delay; attempt N waits N times this
    pub retry_delay_seconds: u64,
    /// Wait used after HTTP 429 when the server sends no Retry-After
    pub default_retry_after_seconds: u64,
    /// Upper bound on consecutive 429 waits for a single request
    pub max_rate_limit_waits: u32,
    pub request_timeout_seconds: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            bingx_requests_per_second: 5.0,
            bybit_requests_per_second: 5.0,
            retry_attempts: 3,
            retry_delay_seconds: 2,
            default_retry_after_seconds: 5,
            max_rate_limit_waits: 5,
            request_timeout_seconds: 30,
        }
    }
}

/// Trade-history lookback and chunking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub lookback_days: u32,
    pub chunk_days: u32,
    pub chunk_delay_ms: u64,
    /// Overall time budget for one run; unlimited when absent
    pub run_deadline_seconds: Option<u64>,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            chunk_days: 6,
            chunk_delay_ms: 500,
            run_deadline_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub output_dir: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            output_dir: "reports".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            log::warn!(
                "Settings file {} not found, using defaults (no exchange configured)",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Overlay credentials from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Overlay credentials from an arbitrary lookup (empty values are ignored).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let targets: [(&str, &mut String); 4] = [
            ("BINGX_API_KEY", &mut self.bingx.api_key),
            ("BINGX_SECRET_KEY", &mut self.bingx.secret_key),
            ("BYBIT_API_KEY", &mut self.bybit.api_key),
            ("BYBIT_SECRET_KEY", &mut self.bybit.secret_key),
        ];

        for (name, slot) in targets {
            if let Some(value) = lookup(name).filter(|v| !v.trim().is_empty()) {
                *slot = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_placeholder_credentials_not_configured() {
        let settings = ExchangeSettings {
            api_key: "your-bingx-api-key".to_string(),
            secret_key: "your-bingx-secret-key".to_string(),
            ..Default::default()
        };
        assert!(!settings.is_configured());

        let empty = ExchangeSettings::default();
        assert!(!empty.is_configured());

        let real = ExchangeSettings {
            api_key: "a1b2c3".to_string(),
            secret_key: "d4e5f6".to_string(),
            ..Default::default()
        };
        assert!(real.is_configured());
    }

    #[test]
    fn test_half_configured_is_not_configured() {
        let settings = ExchangeSettings {
            api_key: "a1b2c3".to_string(),
            secret_key: "YOUR-SECRET".to_string(),
            ..Default::default()
        };
        assert!(!settings.is_configured());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"bybit": {{"api_key": "k", "secret_key": "s", "recv_window_ms": 10000}},
                "history": {{"lookback_days": 14}}}}"#
        )
        .unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert!(settings.bybit.is_configured());
        assert_eq!(settings.bybit.recv_window_ms, Some(10000));
        assert!(!settings.bingx.is_configured());
        assert_eq!(settings.history.lookback_days, 14);
        assert_eq!(settings.history.chunk_days, 6);
        assert_eq!(settings.rate_limiting.retry_attempts, 3);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.json")).unwrap();
        assert!(!settings.bingx.is_configured());
        assert_eq!(settings.report.output_dir, "reports");
    }

    #[test]
    fn test_load_invalid_json_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = Settings::load(file.path()).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[test]
    fn test_overrides_replace_credentials() {
        let mut settings = Settings::default();
        settings.apply_overrides(|name| match name {
            "BINGX_API_KEY" => Some("env-key".to_string()),
            "BINGX_SECRET_KEY" => Some("env-secret".to_string()),
            "BYBIT_API_KEY" => Some("   ".to_string()),
            _ => None,
        });

        assert_eq!(settings.bingx.api_key, "env-key");
        assert!(settings.bingx.is_configured());
        assert!(settings.bybit.api_key.is_empty());
    }

    #[test]
    fn test_base_url_fallback() {
        let settings = ExchangeSettings {
            base_url: "http://127.0.0.1:9000/".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.base_url_or("https://api.bybit.com"), "http://127.0.0.1:9000");
        assert_eq!(
            ExchangeSettings::default().base_url_or("https://api.bybit.com"),
            "https://api.bybit.com"
        );
    }
}
