//! Asset task: fetch one (exchange, pair) and advance its checkpoint

use super::{AssetReport, CollectorContext, CollectorError, TaskOutcome};
use crate::checkpoint::CollectionKey;
use crate::fetcher::FetchError;
use crate::telemetry::{increment_counter, record_latency, CounterMetric, LatencyMetric};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Collect new candles for one exchange/pair
///
/// Reads the resume point, fetches, emits every candle in order and writes
/// the newest close time back as the next resume point. Cancellation is only
/// observed while the fetch is pending; once candles are in hand they are
/// emitted and checkpointed.
pub async fn run_asset_task(
    ctx: &CollectorContext,
    exchange: &str,
    pair: &str,
    cancel: &CancellationToken,
) -> TaskOutcome {
    let key = CollectionKey::new(exchange, pair);

    match collect(ctx, &key, exchange, pair, cancel).await {
        Ok(Some(report)) => TaskOutcome::Completed(report),
        Ok(None) => TaskOutcome::Cancelled(key),
        Err(e) => TaskOutcome::Failed(e),
    }
}

async fn collect(
    ctx: &CollectorContext,
    key: &CollectionKey,
    exchange: &str,
    pair: &str,
    cancel: &CancellationToken,
) -> Result<Option<AssetReport>, CollectorError> {
    let previous = resume_point(ctx, key).await?;
    let after = previous.unwrap_or(ctx.default_after);

    tracing::debug!(key = %key, after, "Fetching candles");

    let started = Instant::now();
    let fetch = tokio::time::timeout(
        ctx.fetch_timeout,
        ctx.fetcher.fetch_ohlc(exchange, pair, after, &ctx.periods),
    );
    let result = tokio::select! {
        _ = cancel.cancelled() => {
            tracing::debug!(key = %key, "Fetch cancelled");
            return Ok(None);
        }
        result = fetch => result,
    };
    record_latency(LatencyMetric::Fetch, started.elapsed());

    let series = match result {
        Ok(Ok(series)) => series,
        Ok(Err(source)) => {
            increment_counter(CounterMetric::FetchErrors);
            tracing::error!(key = %key, error = %source, "Fetch failed");
            return Err(CollectorError::Fetch {
                key: key.clone(),
                source,
            });
        }
        Err(_) => {
            increment_counter(CounterMetric::FetchErrors);
            tracing::error!(key = %key, timeout = ?ctx.fetch_timeout, "Fetch timed out");
            return Err(CollectorError::Fetch {
                key: key.clone(),
                source: FetchError::Timeout(ctx.fetch_timeout),
            });
        }
    };

    let candles = series.candle_count();
    let last_close = ctx
        .emitter
        .emit_series(key, exchange, pair, &series)
        .await
        .map_err(|source| {
            tracing::error!(key = %key, error = %source, "Event emission failed");
            CollectorError::Emit {
                key: key.clone(),
                source,
            }
        })?;

    let checkpoint = match last_close {
        Some(last) => {
            let next = match previous {
                Some(prev) if last < prev => {
                    tracing::warn!(key = %key, last, prev, "Fetched candles older than checkpoint");
                    prev
                }
                _ => last,
            };
            ctx.store
                .set(key, next.to_string())
                .await
                .map_err(|source| CollectorError::Checkpoint {
                    key: key.clone(),
                    source,
                })?;
            Some(next)
        }
        None => None,
    };

    tracing::info!(key = %key, after, candles, checkpoint = ?checkpoint, "Collected candles");

    Ok(Some(AssetReport {
        key: key.clone(),
        after,
        candles,
        checkpoint,
    }))
}

/// Stored resume point for a key, `None` if the key has never been collected
async fn resume_point(
    ctx: &CollectorContext,
    key: &CollectionKey,
) -> Result<Option<i64>, CollectorError> {
    match ctx.store.get(key).await {
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|source| CollectorError::MalformedCheckpoint {
                key: key.clone(),
                value: raw,
                source,
            }),
        None => Ok(None),
    }
}
