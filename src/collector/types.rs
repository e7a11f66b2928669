//! Collector types

use crate::checkpoint::{CheckpointError, CollectionKey};
use crate::emitter::SinkError;
use crate::fetcher::FetchError;
use serde::Serialize;
use std::num::ParseIntError;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors that abort a collection cycle
#[derive(Debug, Error)]
pub enum CollectorError {
    /// The stored resume point is not an integer timestamp
    #[error("malformed checkpoint for {key}: {value:?}")]
    MalformedCheckpoint {
        key: CollectionKey,
        value: String,
        #[source]
        source: ParseIntError,
    },
    /// The remote fetch failed or timed out
    #[error("fetch failed for {key}: {source}")]
    Fetch {
        key: CollectionKey,
        #[source]
        source: FetchError,
    },
    /// The sink refused a candle event, so the checkpoint was left alone
    #[error("event emission failed for {key}: {source}")]
    Emit {
        key: CollectionKey,
        #[source]
        source: SinkError,
    },
    /// The advanced checkpoint could not be persisted
    #[error("checkpoint write failed for {key}: {source}")]
    Checkpoint {
        key: CollectionKey,
        #[source]
        source: CheckpointError,
    },
    /// Every worker exited but some tasks never reported
    #[error("market workers exited with {missing} of {total} tasks unreported")]
    WorkersAborted { missing: usize, total: usize },
    /// The cycle task itself panicked or was aborted
    #[error("collection cycle aborted: {0}")]
    CycleAborted(String),
}

impl CollectorError {
    /// Collection key of the task that failed, if the failure is task-scoped
    pub fn key(&self) -> Option<&CollectionKey> {
        match self {
            CollectorError::MalformedCheckpoint { key, .. }
            | CollectorError::Fetch { key, .. }
            | CollectorError::Emit { key, .. }
            | CollectorError::Checkpoint { key, .. } => Some(key),
            CollectorError::WorkersAborted { .. } | CollectorError::CycleAborted(_) => None,
        }
    }
}

/// Result of one successful asset task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReport {
    pub key: CollectionKey,
    /// Resume point the fetch was issued with
    pub after: i64,
    /// Candles emitted
    pub candles: usize,
    /// Checkpoint written, if any candles were returned
    pub checkpoint: Option<i64>,
}

/// What an asset task reports to its cycle
#[derive(Debug)]
pub enum TaskOutcome {
    Completed(AssetReport),
    Failed(CollectorError),
    /// The cycle was cancelled before the task finished its fetch
    Cancelled(CollectionKey),
}

/// Summary of a completed collection cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    /// Asset tasks completed
    pub tasks: usize,
    /// Candles emitted across all tasks
    pub candles: usize,
    pub duration: Duration,
}

/// Scheduler lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    #[default]
    Idle,
    CycleRunning,
    Stopped,
}

/// Scheduler statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerStats {
    pub state: SchedulerState,
    pub cycles_started: u64,
    pub cycles_completed: u64,
    pub ticks_skipped: u64,
    pub last_cycle: Option<CycleReport>,
}
