use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::{CatalogError, StaticCatalog};

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_COMPACT_THRESHOLD: u64 = 1000;
pub const DEFAULT_COMPACT_INTERVAL_SECS: u64 = 60;

/// Process configuration, read from `HALLBOOK_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub metrics_port: Option<u16>,
    pub compact_threshold: u64,
    pub compact_interval: Duration,
    pub halls: StaticCatalog,
}

impl Config {
    pub fn from_env() -> Result<Self, CatalogError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Numeric values that fail to parse fall back to their defaults, as does a
    /// zero compaction interval.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CatalogError> {
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        Ok(Self {
            data_dir: PathBuf::from(
                lookup("HALLBOOK_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.into()),
            ),
            metrics_port: lookup("HALLBOOK_METRICS_PORT").and_then(|s| s.trim().parse().ok()),
            compact_threshold: parsed("HALLBOOK_COMPACT_THRESHOLD")
                .unwrap_or(DEFAULT_COMPACT_THRESHOLD),
            compact_interval: Duration::from_secs(
                parsed("HALLBOOK_COMPACT_INTERVAL_SECS")
                    .filter(|&secs| secs > 0)
                    .unwrap_or(DEFAULT_COMPACT_INTERVAL_SECS),
            ),
            halls: StaticCatalog::parse(&lookup("HALLBOOK_HALLS").unwrap_or_default())?,
        })
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("reservations.wal")
    }
}
