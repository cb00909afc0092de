//! Periodic retention sweeps.

use nexus_memory::MemoryEngine;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::error::CliResult;

/// Run a retention sweep every `interval` until `shutdown` resolves.
///
/// The first sweep runs immediately. A failed sweep is logged and the loop
/// keeps going; only a panicked sweep task ends it. Returns the number of
/// sweeps that completed.
pub async fn run_retention_loop<F>(
    engine: Arc<MemoryEngine>,
    interval: Duration,
    shutdown: F,
) -> CliResult<u64>
where
    F: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut completed = 0u64;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Retention scheduler stopping after {} sweeps", completed);
                break;
            }
            _ = ticker.tick() => {
                let engine = Arc::clone(&engine);
                // RocksDB writes block; keep them off the runtime threads
                match tokio::task::spawn_blocking(move || engine.sweep_report()).await? {
                    Ok(report) => {
                        tracing::info!(
                            "Retention sweep scanned {} memories, removed {}",
                            report.scanned,
                            report.removed_count()
                        );
                    }
                    Err(e) => tracing::error!("Retention sweep failed: {}", e),
                }
                completed += 1;
            }
        }
    }

    Ok(completed)
}

/// Resolves on Ctrl-C.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
