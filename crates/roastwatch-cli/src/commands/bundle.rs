use super::label;
use crate::OutputFormat;
use anyhow::Result;
use roastwatch_collector::{HarEnvironment, ResourceMonitor};
use roastwatch_core::analysis::BundleAnalysis;
use roastwatch_core::bundle::BundleSnapshot;
use roastwatch_core::clock::SystemClock;
use roastwatch_core::config::TelemetryConfig;
use roastwatch_sink::{TelemetrySink, TracingBackend};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleAudit {
    pub snapshot: BundleSnapshot,
    pub analysis: BundleAnalysis,
}

/// Sample a HAR capture once through the resource monitor, score it and
/// forward the sample to `sink`
pub fn audit_har(
    file: &Path,
    config: &TelemetryConfig,
    sink: &mut TelemetrySink,
) -> Result<BundleAudit> {
    let env = HarEnvironment::from_file(file)?;
    let mut monitor = ResourceMonitor::new(Arc::new(env), Arc::new(SystemClock), config);

    let snapshot = monitor.collect_now();
    let analysis = monitor
        .analyze()
        .ok_or_else(|| anyhow::anyhow!("Resource monitor produced no sample"))?;
    sink.record_bundle(&snapshot, &analysis);

    Ok(BundleAudit { snapshot, analysis })
}

pub fn execute(file: &Path, config: &TelemetryConfig, format: OutputFormat) -> Result<()> {
    tracing::info!("Auditing HAR capture: {}", file.display());

    let mut sink = TelemetrySink::new(TracingBackend);
    let audit = audit_har(file, config, &mut sink)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&audit)?),
        OutputFormat::Table => output_table(&audit),
        OutputFormat::Pretty => output_pretty(&audit),
    }

    Ok(())
}

fn output_pretty(audit: &BundleAudit) {
    use console::style;

    let size = &audit.snapshot.bundle_size;
    let count = &audit.snapshot.resource_count;
    let timing = &audit.snapshot.execution_timing;

    println!("\n{}", style("Bundle Audit").bold().cyan());
    println!("{}", style("============").cyan());

    println!(
        "\n{} {} ({})",
        style("Score:").bold(),
        audit.analysis.score,
        label(&audit.analysis.rating)
    );

    println!("\n{}", style("Resources:").bold());
    println!("  JavaScript:   {:>10} bytes ({} files)", size.javascript, count.javascript);
    println!("  CSS:          {:>10} bytes ({} files)", size.css, count.css);
    println!("  Images:       {:>10} bytes ({} files)", size.images, count.images);
    println!("  Fonts:        {:>10} bytes ({} files)", size.fonts, count.fonts);
    println!("  Other:        {:>10} bytes ({} files)", size.other, count.other);
    println!("  Total:        {:>10} bytes ({} files, {} fetches)", size.total, count.total, count.fetch);

    println!("\n{}", style("Timing:").bold());
    println!("  Script Parsing:     {:.2} ms", timing.script_parsing);
    println!("  Script Execution:   {:.2} ms", timing.script_execution);
    println!("  DOMContentLoaded:   {:.2} ms", timing.dom_content_loaded);
    println!("  Page Load:          {:.2} ms", timing.page_load);

    let compression = &audit.snapshot.compression_stats;
    if compression.compressible_bytes > 0 {
        println!("\n{}", style("Compression:").bold());
        println!("  Gzip Savings:       {:.1}%", compression.gzip_savings);
        println!("  Brotli (estimate):  {:.1}%", compression.brotli_savings);
    }

    if !audit.analysis.issues.is_empty() {
        println!("\n{}", style("Issues:").bold());
        for issue in &audit.analysis.issues {
            println!("  - {}", issue);
        }
    }

    if !audit.analysis.recommendations.is_empty() {
        println!("\n{}", style("Recommendations:").bold());
        for rec in &audit.analysis.recommendations {
            println!("  [{}] {}: {}", label(&rec.priority), rec.title, rec.description);
        }
    }

    println!();
}

fn output_table(audit: &BundleAudit) {
    let size = &audit.snapshot.bundle_size;
    println!("Metric,Value");
    println!("Score,{}", audit.analysis.score);
    println!("Rating,{}", label(&audit.analysis.rating));
    println!("JavaScript (bytes),{}", size.javascript);
    println!("CSS (bytes),{}", size.css);
    println!("Images (bytes),{}", size.images);
    println!("Fonts (bytes),{}", size.fonts);
    println!("Total (bytes),{}", size.total);
    println!("Resources,{}", audit.snapshot.resource_count.total);
    println!("Page Load (ms),{:.2}", audit.snapshot.execution_timing.page_load);
}
