//! Collection scheduler module
//!
//! Fans collection work out across exchanges and asset pairs:
//! - `task`: one (exchange, pair) fetch with its checkpoint protocol
//! - `worker`: the pairs of one exchange, sequentially
//! - `cycle`: one worker per exchange, fan-in of task outcomes
//! - `scheduler`: periodic trigger with an overlap guard

mod cycle;
mod scheduler;
mod task;
mod types;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use cycle::CollectionCycle;
pub use scheduler::Scheduler;
pub use task::run_asset_task;
pub use types::{
    AssetReport, CollectorError, CycleReport, SchedulerState, SchedulerStats, TaskOutcome,
};
pub use worker::run_market_worker;

use crate::checkpoint::CheckpointStore;
use crate::config::CollectorConfig;
use crate::emitter::EventEmitter;
use crate::fetcher::CandleFetcher;
use std::sync::Arc;
use std::time::Duration;

/// Default fetch deadline
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Collaborators and settings shared by every asset task
#[derive(Clone)]
pub struct CollectorContext {
    pub fetcher: Arc<dyn CandleFetcher>,
    pub store: CheckpointStore,
    pub emitter: EventEmitter,
    /// Candle bucket durations requested per fetch
    pub periods: Vec<i64>,
    /// Resume point for keys without a checkpoint
    pub default_after: i64,
    pub fetch_timeout: Duration,
}

impl CollectorContext {
    /// Create a context with hourly buckets and a zero default resume point
    pub fn new(
        fetcher: Arc<dyn CandleFetcher>,
        store: CheckpointStore,
        emitter: EventEmitter,
    ) -> Self {
        Self {
            fetcher,
            store,
            emitter,
            periods: vec![3600],
            default_after: 0,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Create a context using the collector section of the configuration
    pub fn from_config(
        config: &CollectorConfig,
        fetcher: Arc<dyn CandleFetcher>,
        store: CheckpointStore,
        emitter: EventEmitter,
    ) -> Self {
        Self::new(fetcher, store, emitter)
            .periods(config.periods.clone())
            .default_after(config.resume_after())
            .fetch_timeout(config.fetch_timeout())
    }

    /// Set bucket durations
    pub fn periods(mut self, periods: Vec<i64>) -> Self {
        self.periods = periods;
        self
    }

    /// Set the default resume point
    pub fn default_after(mut self, after: i64) -> Self {
        self.default_after = after;
        self
    }

    /// Set the fetch deadline
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}
