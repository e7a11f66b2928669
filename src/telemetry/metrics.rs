//! Prometheus metrics

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Counter metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterMetric {
    /// Collection cycle started
    CyclesStarted,
    /// Collection cycle finished with every task completed
    CyclesCompleted,
    /// Collection cycle aborted by a task failure
    CyclesFailed,
    /// Scheduler tick skipped because a cycle was still running
    TicksSkipped,
    /// Candle event handed to the sink
    CandlesEmitted,
    /// Candle fetch failed (including timeouts)
    FetchErrors,
}

/// Latency metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyMetric {
    /// Remote OHLC fetch
    Fetch,
    /// Whole collection cycle
    Cycle,
}

impl CounterMetric {
    pub fn name(self) -> &'static str {
        match self {
            CounterMetric::CyclesStarted => "ohlc_cycles_started_total",
            CounterMetric::CyclesCompleted => "ohlc_cycles_completed_total",
            CounterMetric::CyclesFailed => "ohlc_cycles_failed_total",
            CounterMetric::TicksSkipped => "ohlc_ticks_skipped_total",
            CounterMetric::CandlesEmitted => "ohlc_candles_emitted_total",
            CounterMetric::FetchErrors => "ohlc_fetch_errors_total",
        }
    }
}

impl LatencyMetric {
    pub fn name(self) -> &'static str {
        match self {
            LatencyMetric::Fetch => "ohlc_fetch_latency_ms",
            LatencyMetric::Cycle => "ohlc_cycle_duration_ms",
        }
    }
}

/// Increment a counter by one
pub fn increment_counter(metric: CounterMetric) {
    ::metrics::counter!(metric.name()).increment(1);
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let value_ms = duration.as_secs_f64() * 1000.0;
    ::metrics::histogram!(metric.name()).record(value_ms);
    tracing::trace!(metric = metric.name(), value_ms, "Recording latency");
}

/// Serve Prometheus metrics on `0.0.0.0:port`
///
/// Must be called from inside the tokio runtime.
pub fn init_metrics_exporter(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;

    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(())
}
