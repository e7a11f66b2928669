//! Collection cycle: one worker per exchange, fan-in of every task outcome

use super::{run_market_worker, CollectorContext, CollectorError, CycleReport, TaskOutcome};
use crate::config::MarketConfig;
use crate::telemetry::{increment_counter, record_latency, CounterMetric, LatencyMetric};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Default time a failing cycle waits for its workers to observe cancellation
const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// One fan-out/fan-in pass over every configured exchange/pair
pub struct CollectionCycle {
    ctx: Arc<CollectorContext>,
    markets: Arc<[MarketConfig]>,
    grace: Duration,
}

impl CollectionCycle {
    pub fn new(ctx: CollectorContext, markets: Vec<MarketConfig>) -> Self {
        Self {
            ctx: Arc::new(ctx),
            markets: markets.into(),
            grace: DEFAULT_GRACE,
        }
    }

    /// Set how long a failing cycle waits for in-flight workers
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Number of task outcomes a successful cycle waits for
    pub fn total_tasks(&self) -> usize {
        self.markets.iter().map(|m| m.pairs.len()).sum()
    }

    pub fn markets(&self) -> &[MarketConfig] {
        &self.markets
    }

    pub fn context(&self) -> &CollectorContext {
        &self.ctx
    }

    /// Run one cycle
    ///
    /// Succeeds once every asset task has completed. The first failed task
    /// resolves the cycle with its error; remaining workers are cancelled and
    /// given the grace period to stop before being aborted.
    pub async fn run(&self) -> Result<CycleReport, CollectorError> {
        let cycle_id = Uuid::new_v4();
        let span = tracing::info_span!("cycle", %cycle_id);
        self.run_inner(cycle_id).instrument(span).await
    }

    async fn run_inner(&self, cycle_id: Uuid) -> Result<CycleReport, CollectorError> {
        let started = Instant::now();
        let total = self.total_tasks();

        increment_counter(CounterMetric::CyclesStarted);
        tracing::info!(markets = self.markets.len(), total, "Collecting rates");

        // Every task reports at most once, so workers never block on send
        let (tx, mut rx) = mpsc::channel(total.max(1));
        let cancel = CancellationToken::new();
        let mut workers = JoinSet::new();

        for market in self.markets.iter() {
            workers.spawn(run_market_worker(
                self.ctx.clone(),
                market.clone(),
                tx.clone(),
                cancel.clone(),
            ));
        }
        drop(tx);

        let mut completed = 0usize;
        let mut candles = 0usize;

        let failure = loop {
            if completed == total {
                break None;
            }
            match rx.recv().await {
                Some(TaskOutcome::Completed(report)) => {
                    completed += 1;
                    candles += report.candles;
                }
                Some(TaskOutcome::Failed(err)) => break Some(err),
                Some(TaskOutcome::Cancelled(key)) => {
                    tracing::debug!(key = %key, "Ignoring cancelled task");
                }
                None => {
                    break Some(CollectorError::WorkersAborted {
                        missing: total - completed,
                        total,
                    })
                }
            }
        };

        let duration = started.elapsed();
        record_latency(LatencyMetric::Cycle, duration);

        match failure {
            None => {
                while let Some(joined) = workers.join_next().await {
                    if let Err(e) = joined {
                        tracing::warn!(error = %e, "Market worker did not exit cleanly");
                    }
                }
                increment_counter(CounterMetric::CyclesCompleted);
                tracing::info!(tasks = completed, candles, ?duration, "Collection cycle completed");
                Ok(CycleReport {
                    cycle_id,
                    tasks: completed,
                    candles,
                    duration,
                })
            }
            Some(err) => {
                increment_counter(CounterMetric::CyclesFailed);
                tracing::error!(error = %err, completed, total, "Collection cycle failed");
                cancel.cancel();
                self.wind_down(&mut workers).await;
                Err(err)
            }
        }
    }

    /// Wait up to the grace period for cancelled workers, then abort the rest
    async fn wind_down(&self, workers: &mut JoinSet<()>) {
        let drained = tokio::time::timeout(self.grace, async {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    tracing::warn!(error = %e, "Market worker did not exit cleanly");
                }
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                remaining = workers.len(),
                grace = ?self.grace,
                "Workers still running after grace period, aborting"
            );
            workers.abort_all();
            while workers.join_next().await.is_some() {}
        }
    }
}
