use anyhow::{Context, Result};
use clap::ValueEnum;
use roastwatch_core::cache::{FileStore, ReportCache};
use roastwatch_core::config::TelemetryConfig;
use std::path::Path;

pub mod analyze;
pub mod bundle;
pub mod export;
pub mod ingest;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportKind {
    Json,
    Csv,
}

/// Configuration from `path`, or defaults when none is given
pub fn load_config(path: Option<&Path>) -> Result<TelemetryConfig> {
    match path {
        Some(path) => TelemetryConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(TelemetryConfig::default()),
    }
}

/// Open the report cache stored in `dir`
pub fn open_cache(dir: &Path, config: &TelemetryConfig) -> Result<ReportCache<FileStore>> {
    let store = FileStore::open(dir)
        .with_context(|| format!("Failed to open report cache at {}", dir.display()))?;
    Ok(ReportCache::with_capacity(
        store,
        config.cache_capacity,
        config.cache_key_prefix.clone(),
    ))
}

pub(crate) fn label<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}
