//! Checkpoint file behavior

use ohlc_collector::checkpoint::{CheckpointStore, CollectionKey};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_existing_file_is_loaded() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("cryptowatchmap.json");
    std::fs::write(&path, r#"{"krakenbtceur": "1600000000"}"#).unwrap();

    let store = CheckpointStore::load(&path).await.unwrap();

    assert_eq!(store.len().await, 1);
    assert_eq!(
        store
            .get(&CollectionKey::new("kraken", "btceur"))
            .await
            .as_deref(),
        Some("1600000000")
    );
}

#[tokio::test]
async fn test_corrupt_file_is_an_error() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("cryptowatchmap.json");
    std::fs::write(&path, "not json").unwrap();

    assert_err!(CheckpointStore::load(&path).await);
}

#[tokio::test]
async fn test_written_file_is_plain_json_object() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("cryptowatchmap.json");

    let store = assert_ok!(CheckpointStore::load(&path).await);
    assert_ok!(
        store
            .set(&CollectionKey::new("bitstamp", "btcusd"), "1700000000")
            .await
    );

    let raw = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed["bitstampbtcusd"], "1700000000");
}
