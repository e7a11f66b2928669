//! Configuration types for ohlc-collector

use crate::checkpoint::CollectionKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub collector: CollectorConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Collection schedule and market selection
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Seconds between scheduler ticks
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,

    /// Candle bucket durations requested from the API (seconds)
    #[serde(default = "default_periods")]
    pub periods: Vec<i64>,

    /// Resume timestamp used when a market has no checkpoint yet; 0 means unset
    #[serde(default = "default_after")]
    pub after: i64,

    /// Deadline for a single OHLC fetch
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// How long a failing cycle waits for in-flight workers to wind down
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Exchanges and their asset pairs
    #[serde(default)]
    pub markets: Vec<MarketConfig>,
}

/// One exchange and the asset pairs collected from it, in order
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MarketConfig {
    pub exchange: String,
    #[serde(default)]
    pub pairs: Vec<String>,
}

/// Remote market-data API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
}

/// Where normalized events are published
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SinkConfig {
    #[serde(default)]
    pub kind: SinkKind,
    pub path: Option<PathBuf>,
}

/// Event sink backend
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Stdout,
    File,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormatConfig,
    pub metrics_port: Option<u16>,
}

/// Log output format as written in the config file
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatConfig {
    #[default]
    Pretty,
    Json,
}

fn default_period_secs() -> u64 {
    60
}
fn default_periods() -> Vec<i64> {
    vec![3600] // hourly
}
fn default_after() -> i64 {
    1_256_760_193
}
fn default_fetch_timeout_secs() -> u64 {
    30
}
fn default_shutdown_grace_secs() -> u64 {
    5
}
fn default_base_url() -> String {
    "https://api.cryptowat.ch".to_string()
}
fn default_api_timeout_secs() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_api_timeout_secs(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormatConfig::Pretty,
            metrics_port: None,
        }
    }
}

impl CollectorConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    /// Effective default resume point, treating 0 as unset
    pub fn resume_after(&self) -> i64 {
        if self.after == 0 {
            default_after()
        } else {
            self.after
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Number of (exchange, pair) combinations collected per cycle
    pub fn total_pairs(&self) -> usize {
        self.markets.iter().map(|m| m.pairs.len()).sum()
    }
}

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required field is missing or empty
    #[error("mandatory field \"{0}\" was not set in config")]
    MandatoryField(String),
    /// A field is present but out of range
    #[error("invalid value for \"{field}\": {reason}")]
    InvalidValue { field: String, reason: String },
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the collector relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        let collector = &self.collector;

        if collector.markets.is_empty() {
            return Err(ConfigError::MandatoryField("collector.markets".into()));
        }
        for (i, market) in collector.markets.iter().enumerate() {
            if market.exchange.trim().is_empty() {
                return Err(ConfigError::MandatoryField(format!(
                    "collector.markets[{i}].exchange"
                )));
            }
            if market.pairs.is_empty() {
                return Err(ConfigError::MandatoryField(format!(
                    "collector.markets[{i}].pairs"
                )));
            }
            if let Some(j) = market.pairs.iter().position(|p| p.trim().is_empty()) {
                return Err(ConfigError::MandatoryField(format!(
                    "collector.markets[{i}].pairs[{j}]"
                )));
            }
        }

        // Every combination owns its checkpoint key, so keys must not repeat
        let mut seen: HashMap<CollectionKey, (usize, usize)> = HashMap::new();
        for (i, market) in collector.markets.iter().enumerate() {
            for (j, pair) in market.pairs.iter().enumerate() {
                let key = CollectionKey::new(&market.exchange, pair);
                if let Some((pi, pj)) = seen.get(&key) {
                    let first = format!("collector.markets[{pi}].pairs[{pj}]");
                    return Err(ConfigError::InvalidValue {
                        field: format!("collector.markets[{i}].pairs[{j}]"),
                        reason: format!("collection key \"{key}\" already used by {first}"),
                    });
                }
                seen.insert(key, (i, j));
            }
        }

        if collector.period_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "collector.period_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if collector.periods.is_empty() {
            return Err(ConfigError::MandatoryField("collector.periods".into()));
        }
        if collector.periods.iter().any(|p| *p <= 0) {
            return Err(ConfigError::InvalidValue {
                field: "collector.periods".into(),
                reason: "bucket durations must be positive".into(),
            });
        }
        if collector.fetch_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "collector.fetch_timeout_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }

        if self.sink.kind == SinkKind::File && self.sink.path.is_none() {
            return Err(ConfigError::MandatoryField("sink.path".into()));
        }

        Ok(())
    }
}
