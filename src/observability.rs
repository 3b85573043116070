use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tracing_subscriber::EnvFilter;

use crate::engine::{EngineError, SubmitOutcome};

/// Counter: submissions. Labels: outcome.
pub const SUBMISSIONS_TOTAL: &str = "hallbook_submissions_total";

/// Counter: state transitions recorded. Labels: action.
pub const DECISIONS_TOTAL: &str = "hallbook_decisions_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "hallbook_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "hallbook_wal_flush_batch_size";

/// Counter: WAL compactions. Labels: status.
pub const COMPACTIONS_TOTAL: &str = "hallbook_compactions_total";

/// Install the tracing subscriber. `RUST_LOG` wins; otherwise `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init_metrics(port: Option<u16>) -> Result<(), BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a submission result to a short label for metrics.
pub fn submission_label(result: &Result<SubmitOutcome, EngineError>) -> &'static str {
    match result {
        Ok(SubmitOutcome::Accepted(r)) if r.conflict_flag => "override",
        Ok(SubmitOutcome::Accepted(_)) => "accepted",
        Ok(SubmitOutcome::Conflict(_)) => "conflict",
        Err(e) => e.kind(),
    }
}
