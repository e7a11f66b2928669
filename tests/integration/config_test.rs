//! Configuration loading

use ohlc_collector::config::{Config, SinkKind};
use std::time::Duration;

#[test]
fn test_example_config_loads() {
    let config = Config::from_toml(include_str!("../../config.toml.example")).unwrap();

    assert_eq!(config.collector.period(), Duration::from_secs(60));
    assert_eq!(config.collector.periods, vec![3600]);
    assert_eq!(config.collector.after, 1_256_760_193);
    assert_eq!(config.collector.markets.len(), 2);
    assert_eq!(config.collector.total_pairs(), 3);
    assert_eq!(config.sink.kind, SinkKind::Stdout);
}

#[test]
fn test_config_file_roundtrip_through_load() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        [collector]
        period_secs = 300

        [[collector.markets]]
        exchange = "kraken"
        pairs = ["btceur"]
        "#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.collector.period(), Duration::from_secs(300));
    assert_eq!(config.api.base_url, "https://api.cryptowat.ch");
}

#[test]
fn test_missing_pairs_rejected() {
    let err = Config::from_toml(
        r#"
        [collector]
        [[collector.markets]]
        exchange = "kraken"
        pairs = []
        "#,
    )
    .unwrap_err();

    assert!(err.to_string().contains("collector.markets[0].pairs"));
}
