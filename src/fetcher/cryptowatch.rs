//! Cryptowatch REST client for historical OHLC candles
//!
//! `GET /markets/{exchange}/{pair}/ohlc?after=..&periods=..` returns, per
//! bucket duration, rows of
//! `[close_time, open, high, low, close, volume, quote_volume]`.

use super::{Candle, CandleFetcher, FetchError, OhlcSeries};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

/// Cryptowatch API base URL
pub const CRYPTOWATCH_API_URL: &str = "https://api.cryptowat.ch";

/// Header carrying the optional API key
const API_KEY_HEADER: &str = "X-CW-API-Key";

/// Configuration for the Cryptowatch client
#[derive(Debug, Clone)]
pub struct CryptowatchConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Optional API key for higher allowances
    pub api_key: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for CryptowatchConfig {
    fn default() -> Self {
        Self {
            base_url: CRYPTOWATCH_API_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Raw OHLC response envelope
#[derive(Debug, Deserialize)]
struct OhlcResponse {
    #[serde(default)]
    result: Option<HashMap<String, Vec<Vec<Value>>>>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the Cryptowatch market-data API
pub struct CryptowatchClient {
    config: CryptowatchConfig,
    client: Client,
}

impl CryptowatchClient {
    /// Create a client with default configuration
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(CryptowatchConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: CryptowatchConfig) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// Build the OHLC endpoint URL for a market
    fn ohlc_url(&self, exchange: &str, pair: &str) -> String {
        format!(
            "{}/markets/{}/{}/ohlc",
            self.config.base_url.trim_end_matches('/'),
            exchange,
            pair
        )
    }

    /// Parse an OHLC response body
    pub(crate) fn parse_body(body: &str) -> Result<OhlcSeries, FetchError> {
        let response: OhlcResponse =
            serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(FetchError::Api(error));
        }

        let result = response
            .result
            .ok_or_else(|| FetchError::Decode("missing result".to_string()))?;

        let mut series = OhlcSeries::new();
        for (period, rows) in result {
            let period = period
                .parse::<i64>()
                .map_err(|_| FetchError::Decode(format!("invalid bucket duration {period:?}")))?;
            let candles = rows
                .iter()
                .map(|row| Self::parse_row(row))
                .collect::<Result<Vec<_>, _>>()?;
            series.extend_bucket(period, candles);
        }

        Ok(series)
    }

    /// Parse one `[close_time, open, high, low, close, volume, ...]` row
    fn parse_row(row: &[Value]) -> Result<Candle, FetchError> {
        if row.len() < 6 {
            return Err(FetchError::Decode(format!(
                "expected at least 6 columns, got {}",
                row.len()
            )));
        }

        let close_time = row[0]
            .as_i64()
            .ok_or_else(|| FetchError::Decode(format!("invalid close time {}", row[0])))?;

        Ok(Candle {
            close_time,
            open: to_decimal(&row[1])?,
            high: to_decimal(&row[2])?,
            low: to_decimal(&row[3])?,
            close: to_decimal(&row[4])?,
            volume: to_decimal(&row[5])?,
        })
    }
}

fn to_decimal(value: &Value) -> Result<Decimal, FetchError> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => return Err(FetchError::Decode(format!("invalid number {other}"))),
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| FetchError::Decode(format!("invalid number {text}")))
}

#[async_trait]
impl CandleFetcher for CryptowatchClient {
    async fn fetch_ohlc(
        &self,
        exchange: &str,
        pair: &str,
        after: i64,
        periods: &[i64],
    ) -> Result<OhlcSeries, FetchError> {
        let url = self.ohlc_url(exchange, pair);
        let periods = periods
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");

        tracing::debug!(url = %url, after, periods = %periods, "Fetching OHLC candles");

        let mut request = self
            .client
            .get(&url)
            .query(&[("after", after.to_string()), ("periods", periods)]);
        if let Some(ref key) = self.config.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            // Cryptowatch reports most failures as {"error": ".."} with a 4xx status
            if let Ok(OhlcResponse {
                error: Some(error), ..
            }) = serde_json::from_str::<OhlcResponse>(&body)
            {
                return Err(FetchError::Api(error));
            }
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Self::parse_body(&body)
    }
}
