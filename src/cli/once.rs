//! Once command implementation

use super::{build_cycle, DEFAULT_CHECKPOINT_PATH};
use crate::config::Config;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct OnceArgs {
    /// Path to the checkpoint file
    #[arg(short = 'p', long = "checkpoint-path", default_value = DEFAULT_CHECKPOINT_PATH)]
    pub checkpoint_path: PathBuf,
}

impl OnceArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let cycle = build_cycle(config, &self.checkpoint_path).await?;
        let result = cycle.run().await;
        // Flush accepted events whether or not the cycle succeeded
        let closed = cycle.context().emitter.close().await;
        let report = result?;
        closed?;
        tracing::info!(
            cycle_id = %report.cycle_id,
            tasks = report.tasks,
            candles = report.candles,
            "Single cycle finished"
        );
        Ok(())
    }
}
