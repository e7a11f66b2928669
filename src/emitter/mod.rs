//! Event emission module
//!
//! Turns fetched candles into normalized events and hands them to a sink

mod sink;

pub use sink::{ChannelSink, EventSink, FileSink, SinkError, StdoutSink};

use crate::checkpoint::CollectionKey;
use crate::fetcher::{Candle, OhlcSeries};
use crate::telemetry::{increment_counter, CounterMetric};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Type tag carried by every candle event
pub const OHLC_EVENT_TYPE: &str = "ohlc";

/// Normalized candle event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OhlcEvent {
    /// Candle close time
    #[serde(rename = "@timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub volume: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub open: Decimal,
    pub close: Decimal,
    /// Asset pair identifier
    pub asset: String,
    pub exchange: String,
}

impl OhlcEvent {
    /// Build the event for one candle, or `None` if its close time is not representable
    pub fn from_candle(exchange: &str, pair: &str, candle: &Candle) -> Option<Self> {
        let timestamp = Utc.timestamp_opt(candle.close_time, 0).single()?;

        Some(Self {
            timestamp,
            event_type: OHLC_EVENT_TYPE.to_string(),
            volume: candle.volume,
            high: candle.high,
            low: candle.low,
            open: candle.open,
            close: candle.close,
            asset: pair.to_string(),
            exchange: exchange.to_string(),
        })
    }
}

/// Publishes candle events and reports the newest close time seen
#[derive(Clone)]
pub struct EventEmitter {
    sink: Arc<dyn EventSink>,
}

impl EventEmitter {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Publish a single candle
    pub async fn emit(
        &self,
        key: &CollectionKey,
        exchange: &str,
        pair: &str,
        candle: &Candle,
    ) -> Result<(), SinkError> {
        match OhlcEvent::from_candle(exchange, pair, candle) {
            Some(event) => {
                tracing::trace!(
                    key = %key,
                    close_time = candle.close_time,
                    high = %candle.high,
                    volume = %candle.volume,
                    "Received candle"
                );
                self.sink.publish(event).await?;
                increment_counter(CounterMetric::CandlesEmitted);
            }
            None => {
                tracing::warn!(
                    key = %key,
                    close_time = candle.close_time,
                    "Skipping candle with unrepresentable close time"
                );
            }
        }
        Ok(())
    }

    /// Publish every candle in fetch order
    ///
    /// Returns the maximum close time across all buckets, or `None` when the
    /// series holds no candles. Stops at the first event the sink refuses.
    pub async fn emit_series(
        &self,
        key: &CollectionKey,
        exchange: &str,
        pair: &str,
        series: &OhlcSeries,
    ) -> Result<Option<i64>, SinkError> {
        let mut last_close: Option<i64> = None;

        for (_, candle) in series.iter() {
            self.emit(key, exchange, pair, candle).await?;
            last_close = Some(match last_close {
                Some(max) => max.max(candle.close_time),
                None => candle.close_time,
            });
        }

        Ok(last_close)
    }

    /// Flush and close the underlying sink
    pub async fn close(&self) -> Result<(), SinkError> {
        self.sink.close().await
    }
}
