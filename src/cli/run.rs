//! Run command implementation

use super::{build_cycle, DEFAULT_CHECKPOINT_PATH};
use crate::collector::Scheduler;
use crate::config::Config;
use clap::Args;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the checkpoint file
    #[arg(short = 'p', long = "checkpoint-path", default_value = DEFAULT_CHECKPOINT_PATH)]
    pub checkpoint_path: PathBuf,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let cycle = build_cycle(config, &self.checkpoint_path).await?;
        let scheduler = Scheduler::new(cycle, config.collector.period())
            .with_shutdown_grace(config.collector.shutdown_grace());

        let stop = CancellationToken::new();
        let trigger = stop.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Received CTRL-C"),
                Err(e) => tracing::error!(error = %e, "Failed to listen for CTRL-C"),
            }
            trigger.cancel();
        });

        let result = scheduler.run(stop).await;
        let closed = scheduler.cycle().context().emitter.close().await;
        result?;
        closed?;

        let stats = scheduler.stats().await;
        tracing::info!(
            cycles_started = stats.cycles_started,
            cycles_completed = stats.cycles_completed,
            ticks_skipped = stats.ticks_skipped,
            "Collector stopped"
        );
        Ok(())
    }
}
