use super::{label, open_cache};
use crate::OutputFormat;
use anyhow::{Context, Result};
use roastwatch_core::analysis::{RumAnalysis, RumAnalyzer};
use roastwatch_core::bundle::BundleSnapshot;
use roastwatch_core::config::TelemetryConfig;
use std::path::Path;

/// Load the cached history in `cache_dir` and analyze it
pub fn analyze_cache(
    cache_dir: &Path,
    bundle_history: Option<&Path>,
    config: &TelemetryConfig,
) -> Result<RumAnalysis> {
    tracing::debug!("Loading report cache: {}", cache_dir.display());

    let mut cache = open_cache(cache_dir, config)?;
    let reports = cache.load()?;

    let mut analyzer = RumAnalyzer::new(reports);
    if let Some(path) = bundle_history {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read bundle history {}", path.display()))?;
        let history: Vec<BundleSnapshot> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse bundle history {}", path.display()))?;
        analyzer = analyzer.with_bundle_history(history);
    }

    Ok(analyzer.analyze())
}

pub fn execute(
    cache_dir: &Path,
    bundle_history: Option<&Path>,
    config: &TelemetryConfig,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!("Analyzing report cache: {}", cache_dir.display());

    let analysis = analyze_cache(cache_dir, bundle_history, config)?;

    match format {
        OutputFormat::Json => output_json(&analysis)?,
        OutputFormat::Table => output_table(&analysis),
        OutputFormat::Pretty => output_pretty(&analysis),
    }

    Ok(())
}

fn output_pretty(analysis: &RumAnalysis) {
    use console::style;

    println!("\n{}", style("RUM Analysis Report").bold().cyan());
    println!("{}", style("===================").cyan());

    println!("\n{}", style("Performance:").bold());
    println!("  Reports Analyzed:   {}", analysis.report_count);
    println!("  Score:              {:.1}", analysis.trend.score);
    println!(
        "  Trend:              {} ({:+.1})",
        label(&analysis.trend.trend),
        analysis.trend.change
    );

    let behavior = &analysis.user_behavior;
    if behavior.sessions_analyzed > 0 {
        println!("\n{}", style("User Behavior:").bold());
        println!("  Sessions:           {}", behavior.sessions_analyzed);
        println!("  Avg Time on Page:   {:.1} s", behavior.avg_session_duration / 1000.0);
        println!("  Avg Engagement:     {:.1}", behavior.avg_engagement);
        println!("  Bounce Rate:        {:.1}%", behavior.bounce_rate);
        for pattern in &behavior.patterns {
            println!("  - {}", pattern);
        }
    }

    let devices = &analysis.device_insights;
    if devices.devices_analyzed > 0 {
        println!("\n{}", style("Devices:").bold());
        println!("  Mobile:             {:.1}%", devices.mobile_percent);
        println!("  Low-end:            {:.1}%", devices.low_end_percent);
        for (connection, share) in &devices.connection_types {
            println!("  {:<20}{:.1}%", format!("{}:", connection), share);
        }
    }

    if !analysis.bottlenecks.slowest_metrics.is_empty() {
        println!("\n{}", style("Slowest Metrics:").bold());
        for (i, metric) in analysis.bottlenecks.slowest_metrics.iter().enumerate() {
            println!(
                "  {}. {} avg {:.2} ({} samples)",
                i + 1,
                metric.metric,
                metric.average,
                metric.samples
            );
        }
    }

    if !analysis.bottlenecks.problem_pages.is_empty() {
        println!("\n{}", style("Problem Pages:").bold());
        for page in &analysis.bottlenecks.problem_pages {
            println!(
                "  {} - score {:.1} over {} views, {} budget violations",
                page.path, page.average_score, page.views, page.violations
            );
        }
    }

    if let Some(trend) = &analysis.bundle_trend {
        println!("\n{}", style("Bundle Trend:").bold());
        println!("  Snapshots:          {}", trend.snapshots);
        println!("  Size Change:        {:+.1}%", trend.size_change_percent);
        println!("  Memory Change:      {:+.1}", trend.memory_change);
    }

    if !analysis.recommendations.is_empty() {
        println!("\n{}", style("Recommendations:").bold());
        for rec in &analysis.recommendations {
            println!(
                "  [{}] {}: {}",
                style(label(&rec.priority)).yellow(),
                rec.title,
                rec.description
            );
        }
    }

    println!();
}

fn output_json(analysis: &RumAnalysis) -> Result<()> {
    let json = serde_json::to_string_pretty(analysis)?;
    println!("{}", json);
    Ok(())
}

fn output_table(analysis: &RumAnalysis) {
    println!("Metric,Value");
    println!("Reports,{}", analysis.report_count);
    println!("Score,{:.1}", analysis.trend.score);
    println!("Trend,{}", label(&analysis.trend.trend));
    println!("Change,{:.1}", analysis.trend.change);
    println!("Bounce Rate (%),{:.1}", analysis.user_behavior.bounce_rate);
    println!("Avg Engagement,{:.1}", analysis.user_behavior.avg_engagement);
    println!("Mobile (%),{:.1}", analysis.device_insights.mobile_percent);
    println!("Low-end (%),{:.1}", analysis.device_insights.low_end_percent);
    for metric in &analysis.bottlenecks.slowest_metrics {
        println!("Avg {},{:.2}", metric.metric, metric.average);
    }
    println!("Recommendations,{}", analysis.recommendations.len());
}
