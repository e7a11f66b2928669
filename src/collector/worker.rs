//! Market worker: the pairs of one exchange, one after another

use super::{run_asset_task, CollectorContext, TaskOutcome};
use crate::config::MarketConfig;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Run every asset task of one market in configuration order
///
/// Each task outcome is forwarded to the cycle. The worker stops at the first
/// failed or cancelled task, or as soon as the cycle is cancelled.
pub async fn run_market_worker(
    ctx: Arc<CollectorContext>,
    market: MarketConfig,
    outcomes: mpsc::Sender<TaskOutcome>,
    cancel: CancellationToken,
) {
    for pair in &market.pairs {
        if cancel.is_cancelled() {
            tracing::debug!(exchange = %market.exchange, "Cycle cancelled, stopping worker");
            return;
        }

        tracing::info!(exchange = %market.exchange, pair = %pair, "Collecting rates");

        let outcome = run_asset_task(&ctx, &market.exchange, pair, &cancel).await;
        let keep_going = matches!(outcome, TaskOutcome::Completed(_));

        if outcomes.send(outcome).await.is_err() {
            tracing::debug!(
                exchange = %market.exchange,
                "Cycle no longer listening, stopping worker"
            );
            return;
        }
        if !keep_going {
            return;
        }
    }
}
