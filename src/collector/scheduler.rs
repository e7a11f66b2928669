//! Periodic scheduler with an overlap guard

use super::{CollectionCycle, CollectorError, CycleReport, SchedulerState, SchedulerStats};
use crate::telemetry::{increment_counter, CounterMetric};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

type CycleHandle = JoinHandle<Result<CycleReport, CollectorError>>;

/// Fires collection cycles on a fixed period
///
/// A single-permit semaphore guards against overlapping cycles: a tick that
/// cannot take the permit is skipped, never queued. The permit is released by
/// the scheduler loop once it has observed the cycle's outcome.
pub struct Scheduler {
    cycle: Arc<CollectionCycle>,
    period: Duration,
    shutdown_grace: Duration,
    guard: Arc<Semaphore>,
    stats: Arc<RwLock<SchedulerStats>>,
}

impl Scheduler {
    pub fn new(cycle: CollectionCycle, period: Duration) -> Self {
        Self {
            cycle: Arc::new(cycle),
            period,
            shutdown_grace: Duration::from_secs(5),
            guard: Arc::new(Semaphore::new(1)),
            stats: Arc::new(RwLock::new(SchedulerStats::default())),
        }
    }

    /// Set how long `run` waits for an in-flight cycle after a stop signal
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn cycle(&self) -> &CollectionCycle {
        &self.cycle
    }

    /// Current statistics
    pub async fn stats(&self) -> SchedulerStats {
        self.stats.read().await.clone()
    }

    pub async fn state(&self) -> SchedulerState {
        self.stats.read().await.state
    }

    /// Whether a cycle currently holds the overlap guard
    pub fn is_cycle_running(&self) -> bool {
        self.guard.available_permits() == 0
    }

    /// Run until `stop` is cancelled or a cycle fails
    ///
    /// The first tick fires immediately. A stop signal ends the trigger but
    /// does not cancel an in-flight cycle; `run` waits up to the shutdown
    /// grace for it to finish and surfaces its failure, if any.
    pub async fn run(&self, stop: CancellationToken) -> Result<(), CollectorError> {
        tracing::info!(period = ?self.period, "Collector is running! Hit CTRL-C to stop it.");

        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight: Option<CycleHandle> = None;
        let mut permit: Option<OwnedSemaphorePermit> = None;

        loop {
            tokio::select! {
                biased;

                _ = stop.cancelled() => {
                    tracing::info!("Stop requested, stopping scheduler");
                    break;
                }

                joined = wait_cycle(&mut in_flight) => {
                    in_flight = None;
                    let result = self.finish_cycle(joined, &mut permit).await;
                    if let Err(e) = result {
                        self.set_state(SchedulerState::Stopped).await;
                        return Err(e);
                    }
                }

                _ = ticker.tick() => {
                    match self.guard.clone().try_acquire_owned() {
                        Ok(acquired) => {
                            permit = Some(acquired);
                            in_flight = Some(self.start_cycle().await);
                        }
                        Err(_) => {
                            increment_counter(CounterMetric::TicksSkipped);
                            self.stats.write().await.ticks_skipped += 1;
                            tracing::debug!("Previous cycle still running, skipping tick");
                        }
                    }
                }
            }
        }

        let result = match in_flight.as_mut() {
            Some(handle) => {
                tracing::info!(grace = ?self.shutdown_grace, "Waiting for in-flight cycle");
                match tokio::time::timeout(self.shutdown_grace, handle).await {
                    Ok(joined) => self.finish_cycle(joined, &mut permit).await.map(|_| ()),
                    Err(_) => {
                        tracing::warn!("In-flight cycle still running at shutdown, detaching");
                        Ok(())
                    }
                }
            }
            None => Ok(()),
        };

        self.set_state(SchedulerState::Stopped).await;
        result
    }

    async fn start_cycle(&self) -> CycleHandle {
        {
            let mut stats = self.stats.write().await;
            stats.cycles_started += 1;
            stats.state = SchedulerState::CycleRunning;
        }

        let cycle = self.cycle.clone();
        tokio::spawn(async move { cycle.run().await })
    }

    /// Record a cycle outcome and release the overlap guard
    async fn finish_cycle(
        &self,
        joined: Result<Result<CycleReport, CollectorError>, JoinError>,
        permit: &mut Option<OwnedSemaphorePermit>,
    ) -> Result<CycleReport, CollectorError> {
        let result = joined.unwrap_or_else(|e| Err(CollectorError::CycleAborted(e.to_string())));

        {
            let mut stats = self.stats.write().await;
            match &result {
                Ok(report) => {
                    stats.cycles_completed += 1;
                    stats.last_cycle = Some(report.clone());
                    stats.state = SchedulerState::Idle;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Collection cycle failed, stopping scheduler");
                    stats.state = SchedulerState::Stopped;
                }
            }
        }

        permit.take();
        result
    }

    async fn set_state(&self, state: SchedulerState) {
        self.stats.write().await.state = state;
    }
}

/// Resolve with the in-flight cycle's result, or never if none is running
async fn wait_cycle(
    in_flight: &mut Option<CycleHandle>,
) -> Result<Result<CycleReport, CollectorError>, JoinError> {
    match in_flight {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
