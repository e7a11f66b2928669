//! Candle fetcher types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// One OHLC bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket close time (seconds since epoch)
    pub close_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Fetch result: candle sequences keyed by bucket duration
///
/// Buckets iterate in ascending duration order; candles keep the order the
/// API returned them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OhlcSeries {
    buckets: BTreeMap<i64, Vec<Candle>>,
}

impl OhlcSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append candles to the bucket for `period`
    pub fn extend_bucket(&mut self, period: i64, candles: impl IntoIterator<Item = Candle>) {
        self.buckets.entry(period).or_default().extend(candles);
    }

    /// Builder-style variant of [`extend_bucket`](Self::extend_bucket)
    pub fn with_bucket(mut self, period: i64, candles: Vec<Candle>) -> Self {
        self.extend_bucket(period, candles);
        self
    }

    /// Candles for one bucket duration
    pub fn bucket(&self, period: i64) -> Option<&[Candle]> {
        self.buckets.get(&period).map(Vec::as_slice)
    }

    /// Bucket durations present in the result
    pub fn periods(&self) -> impl Iterator<Item = i64> + '_ {
        self.buckets.keys().copied()
    }

    /// Every candle with its bucket duration
    pub fn iter(&self) -> impl Iterator<Item = (i64, &Candle)> + '_ {
        self.buckets
            .iter()
            .flat_map(|(period, candles)| candles.iter().map(move |c| (*period, c)))
    }

    /// Total candles across all buckets
    pub fn candle_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.candle_count() == 0
    }
}

/// Errors returned by a candle fetch
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success HTTP status
    #[error("HTTP error: {status} - {body}")]
    Status { status: u16, body: String },
    /// The API answered with an error payload
    #[error("API error: {0}")]
    Api(String),
    /// The response body could not be interpreted
    #[error("invalid OHLC response: {0}")]
    Decode(String),
    /// The fetch did not finish before its deadline
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
}
