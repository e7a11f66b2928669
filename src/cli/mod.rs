//! CLI interface for ohlc-collector
//!
//! Provides subcommands for:
//! - `run`: Collect on a fixed period until interrupted
//! - `once`: Run a single collection cycle
//! - `checkpoints`: Show stored resume points
//! - `config`: Show configuration

mod checkpoints;
mod once;
mod run;

pub use checkpoints::CheckpointsArgs;
pub use once::OnceArgs;
pub use run::RunArgs;

use crate::checkpoint::CheckpointStore;
use crate::collector::{CollectionCycle, CollectorContext};
use crate::config::{Config, SinkKind};
use crate::emitter::{EventEmitter, EventSink, FileSink, StdoutSink};
use crate::fetcher::{CryptowatchClient, CryptowatchConfig};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Checkpoint file used when `-p` is not given
pub const DEFAULT_CHECKPOINT_PATH: &str = "cryptowatchmap.json";

/// Queue depth between the collector and the file writer
const FILE_SINK_BUFFER: usize = 10_000;

#[derive(Parser, Debug)]
#[command(name = "ohlc-collector")]
#[command(about = "Periodic OHLC candle collector with resumable checkpoints")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect on a fixed period until interrupted
    Run(RunArgs),
    /// Run a single collection cycle and exit
    Once(OnceArgs),
    /// Show stored checkpoints
    Checkpoints(CheckpointsArgs),
    /// Show configuration
    Config,
}

/// Build a collection cycle from configuration and a checkpoint file
pub(crate) async fn build_cycle(
    config: &Config,
    checkpoint_path: &Path,
) -> anyhow::Result<CollectionCycle> {
    let fetcher = CryptowatchClient::with_config(CryptowatchConfig {
        base_url: config.api.base_url.clone(),
        api_key: config.api.api_key.clone(),
        timeout: Duration::from_secs(config.api.timeout_secs),
    })
    .context("failed to build HTTP client")?;

    let store = CheckpointStore::load(checkpoint_path).await.with_context(|| {
        format!("failed to load checkpoints from {}", checkpoint_path.display())
    })?;

    let sink: Arc<dyn EventSink> = match config.sink.kind {
        SinkKind::Stdout => Arc::new(StdoutSink::new()),
        SinkKind::File => {
            let path = config
                .sink
                .path
                .as_ref()
                .context("sink.path must be set for the file sink")?;
            Arc::new(
                FileSink::open(path, FILE_SINK_BUFFER)
                    .await
                    .with_context(|| format!("failed to open event file {}", path.display()))?,
            )
        }
    };

    let ctx = CollectorContext::from_config(
        &config.collector,
        Arc::new(fetcher),
        store,
        EventEmitter::new(sink),
    );

    Ok(CollectionCycle::new(ctx, config.collector.markets.clone())
        .with_grace(config.collector.shutdown_grace()))
}
