//! Checkpoints command implementation

use super::DEFAULT_CHECKPOINT_PATH;
use crate::checkpoint::CheckpointStore;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CheckpointsArgs {
    /// Path to the checkpoint file
    #[arg(short = 'p', long = "checkpoint-path", default_value = DEFAULT_CHECKPOINT_PATH)]
    pub checkpoint_path: PathBuf,
}

impl CheckpointsArgs {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let store = CheckpointStore::load(&self.checkpoint_path).await?;
        let entries = store.snapshot().await;

        if entries.is_empty() {
            println!("No checkpoints in {}", self.checkpoint_path.display());
            return Ok(());
        }

        println!("Checkpoints in {}:", self.checkpoint_path.display());
        for (key, value) in entries {
            println!("  {key}: {value}");
        }
        Ok(())
    }
}
