//! Scheduler timing scenarios on a paused clock

use crate::support::{cycle, market, Reply, TableFetcher};
use ohlc_collector::checkpoint::CheckpointStore;
use ohlc_collector::collector::{Scheduler, SchedulerState};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn test_slow_cycles_never_overlap() {
    let fetcher = Arc::new(
        TableFetcher::new()
            .reply("A", "X", Reply::Candles(vec![1100]))
            .delay(Duration::from_secs(25)),
    );
    let (cycle, _events) = cycle(
        fetcher.clone(),
        CheckpointStore::in_memory(),
        vec![market("A", &["X"])],
    );
    let scheduler = Arc::new(
        Scheduler::new(cycle, Duration::from_secs(10)).with_shutdown_grace(Duration::from_secs(60)),
    );
    let stop = CancellationToken::new();

    let handle = tokio::spawn({
        let scheduler = scheduler.clone();
        let stop = stop.clone();
        async move { scheduler.run(stop).await }
    });

    tokio::time::sleep(Duration::from_secs(95)).await;
    stop.cancel();
    handle.await.unwrap().unwrap();

    let stats = scheduler.stats().await;
    assert!(stats.ticks_skipped >= 2);
    assert_eq!(stats.cycles_completed, stats.cycles_started);
    assert_eq!(fetcher.calls().len() as u64, stats.cycles_started);
    assert_eq!(stats.state, SchedulerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_failure_terminates_run() {
    let fetcher = Arc::new(TableFetcher::new().reply("B", "Z", Reply::Error("boom")));
    let (cycle, _events) = cycle(
        fetcher,
        CheckpointStore::in_memory(),
        vec![market("A", &["X"]), market("B", &["Y", "Z"])],
    );
    let scheduler = Scheduler::new(cycle, Duration::from_secs(60));

    let err = scheduler.run(CancellationToken::new()).await.unwrap_err();

    assert_eq!(err.key().map(|k| k.as_str()), Some("BZ"));
    assert_eq!(scheduler.stats().await.cycles_started, 1);
    assert_eq!(scheduler.state().await, SchedulerState::Stopped);
}
