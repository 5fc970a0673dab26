use super::{ExportKind, open_cache};
use anyhow::{Context, Result};
use roastwatch_core::config::TelemetryConfig;
use roastwatch_core::export::{ExportFormat, export};
use std::path::Path;

/// Render the cached history in `cache_dir`, most recent report first
pub fn export_cache(cache_dir: &Path, kind: ExportKind, config: &TelemetryConfig) -> Result<String> {
    let mut cache = open_cache(cache_dir, config)?;
    let reports = cache.load()?;

    let format = match kind {
        ExportKind::Json => ExportFormat::Json,
        ExportKind::Csv => ExportFormat::Csv,
    };
    Ok(export(&reports, format)?)
}

pub fn execute(
    cache_dir: &Path,
    kind: ExportKind,
    output: Option<&Path>,
    config: &TelemetryConfig,
) -> Result<()> {
    tracing::info!("Exporting report cache: {}", cache_dir.display());

    let rendered = export_cache(cache_dir, kind, config)?;

    match output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote export to {}", path.display());
        }
        None => print!("{}", rendered),
    }

    Ok(())
}
