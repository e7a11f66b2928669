//! Collection cycle scenarios

use crate::support::{cycle, market, Reply, TableFetcher};
use ohlc_collector::checkpoint::{CheckpointStore, CollectionKey};
use ohlc_collector::collector::{CollectionCycle, CollectorContext, CollectorError};
use ohlc_collector::emitter::{EventEmitter, FileSink};
use ohlc_collector::fetcher::FetchError;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_first_run_starts_from_default_and_checkpoints_max_close() {
    let fetcher = Arc::new(TableFetcher::new().reply("A", "X", Reply::Candles(vec![1100, 1200])));
    let store = CheckpointStore::in_memory();
    let (cycle, mut events) = cycle(fetcher.clone(), store.clone(), vec![market("A", &["X"])]);

    let report = cycle.run().await.unwrap();

    assert_eq!(report.tasks, 1);
    assert_eq!(report.candles, 2);
    assert_eq!(fetcher.calls(), vec![("A".to_string(), "X".to_string(), 1000)]);
    assert_eq!(
        store.get(&CollectionKey::new("A", "X")).await.as_deref(),
        Some("1200")
    );

    let first = events.recv().await.unwrap();
    assert_eq!(first.event_type, "ohlc");
    assert_eq!(first.exchange, "A");
    assert_eq!(first.asset, "X");
    assert_eq!(first.timestamp.timestamp(), 1100);
    assert_eq!(events.recv().await.unwrap().timestamp.timestamp(), 1200);
}

#[tokio::test]
async fn test_zero_candles_complete_without_checkpoint() {
    let fetcher = Arc::new(TableFetcher::new());
    let store = CheckpointStore::in_memory();
    let (cycle, mut events) = cycle(fetcher, store.clone(), vec![market("A", &["X"])]);

    let report = cycle.run().await.unwrap();

    assert_eq!(report.tasks, 1);
    assert_eq!(report.candles, 0);
    assert!(store.is_empty().await);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_failed_pair_fails_cycle_and_keeps_other_checkpoints() {
    let fetcher = Arc::new(
        TableFetcher::new()
            .reply("A", "X", Reply::Candles(vec![1500]))
            .reply("B", "Y", Reply::Candles(vec![1400]))
            .reply("B", "Z", Reply::Error("Instrument not found")),
    );
    let store = CheckpointStore::in_memory();
    let (cycle, _events) = cycle(
        fetcher.clone(),
        store.clone(),
        vec![market("A", &["X"]), market("B", &["Y", "Z"])],
    );

    let err = cycle.run().await.unwrap_err();

    assert_eq!(err.key(), Some(&CollectionKey::new("B", "Z")));
    assert!(matches!(
        err,
        CollectorError::Fetch {
            source: FetchError::Api(ref message),
            ..
        } if message == "Instrument not found"
    ));
    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.get("BY").map(String::as_str), Some("1400"));
    assert!(!snapshot.contains_key("BZ"));
}

#[tokio::test]
async fn test_second_cycle_resumes_from_checkpoint() {
    let fetcher = Arc::new(TableFetcher::new().reply("A", "X", Reply::Candles(vec![1100, 1200])));
    let store = CheckpointStore::in_memory();
    let (cycle, _events) = cycle(fetcher.clone(), store.clone(), vec![market("A", &["X"])]);

    cycle.run().await.unwrap();
    cycle.run().await.unwrap();

    let afters: Vec<i64> = fetcher.calls().into_iter().map(|(_, _, after)| after).collect();
    assert_eq!(afters, vec![1000, 1200]);
}

#[tokio::test]
async fn test_checkpoints_persist_across_store_reloads() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("cryptowatchmap.json");
    let fetcher = Arc::new(TableFetcher::new().reply("A", "X", Reply::Candles(vec![1300])));

    let store = CheckpointStore::load(&path).await.unwrap();
    let (cycle, _events) = cycle(fetcher.clone(), store, vec![market("A", &["X"])]);
    cycle.run().await.unwrap();

    let reloaded = CheckpointStore::load(&path).await.unwrap();
    assert_eq!(
        reloaded.get(&CollectionKey::new("A", "X")).await.as_deref(),
        Some("1300")
    );
}

#[tokio::test(start_paused = true)]
async fn test_completed_market_keeps_checkpoint_when_later_pair_fails() {
    let fetcher = Arc::new(
        TableFetcher::new()
            .reply("A", "X", Reply::Candles(vec![1100, 1500]))
            .reply("B", "Y", Reply::Candles(vec![1400]))
            .reply("B", "Z", Reply::Error("Instrument not found"))
            .delay_market("B", "Z", Duration::from_millis(50)),
    );
    let store = CheckpointStore::in_memory();
    let (cycle, _events) = cycle(
        fetcher,
        store.clone(),
        vec![market("A", &["X"]), market("B", &["Y", "Z"])],
    );

    let err = cycle.run().await.unwrap_err();

    assert_eq!(err.key().map(|k| k.as_str()), Some("BZ"));
    assert_eq!(
        store.get(&CollectionKey::new("A", "X")).await.as_deref(),
        Some("1500")
    );
    assert_eq!(
        store.get(&CollectionKey::new("B", "Y")).await.as_deref(),
        Some("1400")
    );
    assert!(!store.contains(&CollectionKey::new("B", "Z")).await);
}

#[tokio::test]
async fn test_file_sink_holds_every_event_once_closed() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let events_path = temp_dir.path().join("events.jsonl");
    let closes: Vec<i64> = (1..=500).map(|i| 1000 + i * 60).collect();
    let fetcher = Arc::new(TableFetcher::new().reply("A", "X", Reply::Candles(closes)));
    let store = CheckpointStore::in_memory();

    let sink = FileSink::open(&events_path, 8).await.unwrap();
    let emitter = EventEmitter::new(Arc::new(sink));
    let ctx = CollectorContext::new(fetcher, store.clone(), emitter).default_after(1000);
    let cycle = CollectionCycle::new(ctx, vec![market("A", &["X"])]);

    let report = cycle.run().await.unwrap();
    cycle.context().emitter.close().await.unwrap();

    assert_eq!(report.candles, 500);
    let written = std::fs::read_to_string(&events_path).unwrap();
    assert_eq!(written.lines().count(), 500);
    assert_eq!(
        store.get(&CollectionKey::new("A", "X")).await.as_deref(),
        Some("31000")
    );
}
