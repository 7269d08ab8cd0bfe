//! Background tasks keeping the backup queue stocked and fresh.

use crate::backup::BackupQueue;
use crate::config::ProxyPoolConfig;
use crate::error::ProviderError;
use crate::provider::ProxyProvider;

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use url::Url;

/// How a single fill cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FillOutcome {
    /// The queue reached capacity.
    Filled,
    /// Attempts ran out before the queue was full.
    Short,
    /// The provider could not be reached or answered garbage.
    Aborted,
}

/// Call the provider until the queue is full or attempts run out.
///
/// Provider calls happen outside the queue lock; only the enqueue locks.
pub(crate) async fn fill_cycle(
    queue: &BackupQueue,
    provider: &dyn ProxyProvider,
    api: &Url,
    config: &ProxyPoolConfig,
) -> FillOutcome {
    debug!("Backup queue at {}/{}, refilling", queue.len(), queue.capacity());
    let mut attempts = 0;

    while !queue.is_full() {
        if attempts >= config.max_fetch_attempts {
            warn!(
                "Backup queue still at {}/{} after {} fetches, check backup capacity and freshness threshold",
                queue.len(),
                queue.capacity(),
                attempts
            );
            return FillOutcome::Short;
        }
        attempts += 1;

        match provider.fetch(api).await {
            Ok(batch) => {
                let received = batch.len();
                let accepted = queue.push_fresh(batch, config.freshness_threshold);
                debug!("Accepted {}/{} proxies into backup queue", accepted, received);
            }
            Err(ProviderError::Throttled { retry_after }) => {
                warn!("Provider throttled, sleeping {:?}", retry_after);
                time::sleep(retry_after).await;
            }
            Err(e @ ProviderError::Api { .. }) => {
                error!("Refill attempt {} failed: {}", attempts, e);
            }
            Err(e) => {
                error!("Refill aborted: {}", e);
                return FillOutcome::Aborted;
            }
        }
    }

    debug!("Backup queue refilled to {}", queue.len());
    FillOutcome::Filled
}

/// Spawn the refiller. It fills once right away, then again on every demand signal.
///
/// While a failed cycle leaves the queue empty it keeps retrying every
/// `throttle_backoff` instead of waiting for demand.
pub(crate) fn spawn_refiller(
    queue: Arc<BackupQueue>,
    provider: Arc<dyn ProxyProvider>,
    api: Url,
    config: ProxyPoolConfig,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if *shutdown.borrow() {
                break;
            }
            let outcome = tokio::select! {
                outcome = fill_cycle(&queue, provider.as_ref(), &api, &config) => outcome,
                _ = shutdown.changed() => break,
            };
            // Consumers blocked on an empty queue signal demand only once.
            let starved = outcome != FillOutcome::Filled && queue.is_empty();
            if outcome == FillOutcome::Aborted || starved {
                tokio::select! {
                    _ = time::sleep(config.throttle_backoff) => {}
                    _ = shutdown.changed() => break,
                }
            }
            if starved {
                continue;
            }
            tokio::select! {
                _ = queue.wait_for_demand() => {}
                _ = shutdown.changed() => break,
            }
        }
        info!("Backup refiller stopped");
    })
}

/// Spawn the task that discards the whole backup queue every `interval`.
pub(crate) fn spawn_flush(
    queue: Arc<BackupQueue>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if interval.is_zero() {
            warn!("Backup flush disabled: clear interval is zero");
            return;
        }
        let mut ticker = time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let queue = Arc::clone(&queue);
                    tokio::spawn(async move {
                        let cleared = queue.clear();
                        debug!("Flushed {} backup proxies", cleared);
                    });
                }
                _ = shutdown.changed() => break,
            }
        }
        info!("Backup flush stopped");
    })
}
