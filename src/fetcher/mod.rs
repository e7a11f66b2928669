//! Candle fetcher module
//!
//! Pulls historical OHLC candles from the remote market-data API

mod cryptowatch;
mod types;

pub use cryptowatch::{CryptowatchClient, CryptowatchConfig, CRYPTOWATCH_API_URL};
pub use types::{Candle, FetchError, OhlcSeries};

use async_trait::async_trait;

/// Trait for OHLC data sources
#[async_trait]
pub trait CandleFetcher: Send + Sync {
    /// Fetch candles closing after `after` for each requested bucket duration
    async fn fetch_ohlc(
        &self,
        exchange: &str,
        pair: &str,
        after: i64,
        periods: &[i64],
    ) -> Result<OhlcSeries, FetchError>;
}
