//! Scripted fetcher for collector tests

use crate::fetcher::{Candle, CandleFetcher, FetchError, OhlcSeries};
use async_trait::async_trait;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) fn candle(close_time: i64) -> Candle {
    Candle {
        close_time,
        open: dec!(100),
        high: dec!(110),
        low: dec!(90),
        close: dec!(105),
        volume: dec!(1.25),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FetchCall {
    pub exchange: String,
    pub pair: String,
    pub after: i64,
    pub periods: Vec<i64>,
}

#[derive(Debug, Clone)]
struct MarketScript {
    result: Result<Vec<i64>, String>,
    delay: Duration,
    hang: bool,
}

impl Default for MarketScript {
    fn default() -> Self {
        Self {
            result: Ok(vec![]),
            delay: Duration::ZERO,
            hang: false,
        }
    }
}

/// Fetcher answering from per-market scripts; unscripted markets return no candles
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    scripts: Mutex<HashMap<(String, String), MarketScript>>,
    calls: Mutex<Vec<FetchCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(self, exchange: &str, pair: &str, f: impl FnOnce(&mut MarketScript)) -> Self {
        {
            let mut scripts = self.scripts.lock().unwrap();
            let entry = scripts
                .entry((exchange.to_string(), pair.to_string()))
                .or_default();
            f(entry);
        }
        self
    }

    pub fn with_candles(self, exchange: &str, pair: &str, closes: &[i64]) -> Self {
        let closes = closes.to_vec();
        self.script(exchange, pair, |s| s.result = Ok(closes))
    }

    pub fn with_error(self, exchange: &str, pair: &str, message: &str) -> Self {
        let message = message.to_string();
        self.script(exchange, pair, |s| s.result = Err(message))
    }

    pub fn with_delay(self, exchange: &str, pair: &str, delay: Duration) -> Self {
        self.script(exchange, pair, |s| s.delay = delay)
    }

    pub fn with_hang(self, exchange: &str, pair: &str) -> Self {
        self.script(exchange, pair, |s| s.hang = true)
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandleFetcher for ScriptedFetcher {
    async fn fetch_ohlc(
        &self,
        exchange: &str,
        pair: &str,
        after: i64,
        periods: &[i64],
    ) -> Result<OhlcSeries, FetchError> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(&(exchange.to_string(), pair.to_string()))
            .cloned()
            .unwrap_or_default();

        self.calls.lock().unwrap().push(FetchCall {
            exchange: exchange.to_string(),
            pair: pair.to_string(),
            after,
            periods: periods.to_vec(),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if script.hang {
            std::future::pending::<()>().await;
        }
        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }

        match script.result {
            Ok(closes) => {
                let period = periods.first().copied().unwrap_or(3600);
                Ok(OhlcSeries::new().with_bucket(period, closes.into_iter().map(candle).collect()))
            }
            Err(message) => Err(FetchError::Api(message)),
        }
    }
}
