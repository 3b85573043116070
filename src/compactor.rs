use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::engine::Engine;
use crate::observability::COMPACTIONS_TOTAL;

/// Compact once at least `threshold` records were appended since the last time.
pub async fn compact_if_needed(engine: &Engine, threshold: u64) -> bool {
    let appended = engine.wal_appends_since_compact().await;
    if appended < threshold {
        return false;
    }
    match engine.compact_wal().await {
        Ok(()) => {
            metrics::counter!(COMPACTIONS_TOTAL, "status" => "ok").increment(1);
            info!(appended, "compacted WAL");
            true
        }
        Err(e) => {
            metrics::counter!(COMPACTIONS_TOTAL, "status" => "error").increment(1);
            warn!(error = %e, "WAL compaction failed");
            false
        }
    }
}

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Background task that checks the WAL every `every`, at most once a second.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64, every: Duration) {
    let mut interval = tokio::time::interval(every.max(MIN_INTERVAL));
    loop {
        interval.tick().await;
        compact_if_needed(&engine, threshold).await;
    }
}
