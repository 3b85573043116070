use std::sync::Arc;

use tracing::{info, warn};

use hallbook::clock::SystemClock;
use hallbook::compactor;
use hallbook::config::Config;
use hallbook::engine::Engine;
use hallbook::notify::NotifyHub;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    hallbook::observability::init_tracing();

    let config = Config::from_env()?;
    hallbook::observability::init_metrics(config.metrics_port)?;

    std::fs::create_dir_all(&config.data_dir)?;
    if config.halls.is_empty() {
        warn!("HALLBOOK_HALLS is empty; every submission will be refused");
    }

    let engine = Arc::new(Engine::new(
        config.wal_path(),
        Arc::new(config.halls.clone()),
        Arc::new(SystemClock),
        Arc::new(NotifyHub::new()),
    )?);

    info!("hallbook engine ready");
    info!("  data_dir: {}", config.data_dir.display());
    info!("  halls: {}", config.halls.len());
    info!("  compact_threshold: {}", config.compact_threshold);
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let compactor = tokio::spawn(compactor::run_compactor(
        engine.clone(),
        config.compact_threshold,
        config.compact_interval,
    ));

    shutdown_signal().await?;
    info!("shutdown signal received");
    compactor.abort();

    // Leave a compact log behind for the next start.
    if let Err(e) = engine.compact_wal().await {
        warn!(error = %e, "final compaction failed");
    }

    info!("hallbook stopped");
    Ok(())
}

async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            r = tokio::signal::ctrl_c() => r,
            _ = sigterm.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
