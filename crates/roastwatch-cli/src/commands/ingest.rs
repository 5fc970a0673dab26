use super::open_cache;
use crate::OutputFormat;
use anyhow::{Context, Result};
use roastwatch_collector::environment::{DeviceHints, InteractionCounters};
use roastwatch_collector::{MetricAggregator, StaticEnvironment, TelemetrySession};
use roastwatch_core::clock::ManualClock;
use roastwatch_core::config::TelemetryConfig;
use roastwatch_core::timing::NavigationTiming;
use roastwatch_core::vitals::RawVital;
use roastwatch_sink::{TelemetrySink, TracingBackend};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// A recorded browsing session
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub user_agent: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub device_hints: DeviceHints,
    pub page_views: Vec<RecordedPageView>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedPageView {
    pub url: String,
    /// Epoch milliseconds of navigation start
    pub started_at: i64,
    #[serde(default)]
    pub navigation_timing: Option<NavigationTiming>,
    #[serde(default)]
    pub interactions: Option<InteractionCounters>,
    pub events: Vec<RecordedEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedEvent {
    /// Milliseconds after navigation start
    pub offset_ms: u64,
    #[serde(flatten)]
    pub vital: RawVital,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub page_views: usize,
    pub reports: usize,
    pub skipped_events: usize,
    pub anomalies: usize,
    pub regressions: usize,
    pub cache_keys: Vec<String>,
}

/// Replay every page view of a recording through its own aggregator,
/// persisting each flushed report into `cache_dir`
pub fn replay(file: &Path, cache_dir: &Path, config: &TelemetryConfig) -> Result<IngestSummary> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read recording {}", file.display()))?;
    let mut recording: Recording = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse recording {}", file.display()))?;
    recording.page_views.sort_by_key(|p| p.started_at);

    let mut summary = IngestSummary::default();

    for view in &recording.page_views {
        summary.page_views += 1;

        let clock = ManualClock::new(view.started_at);
        let env = StaticEnvironment::new(&view.url, &recording.user_agent);
        env.set_device_hints(recording.device_hints.clone());
        if let Some(timing) = &view.navigation_timing {
            env.set_navigation_timing(timing.clone());
        }
        if let Some(interactions) = view.interactions {
            env.set_interactions(interactions);
        }

        let mut aggregator =
            MetricAggregator::new(Arc::new(env), Arc::new(clock.clone()), config);
        if let Some(session_id) = &recording.session_id {
            aggregator = aggregator.with_session_id(session_id.clone());
        }
        let mut session = TelemetrySession::new(
            aggregator,
            open_cache(cache_dir, config)?,
            TelemetrySink::new(TracingBackend),
        );

        let mut events = view.events.clone();
        events.sort_by_key(|e| e.offset_ms);

        let mut outcomes = Vec::new();
        for event in &events {
            // A pending flush whose deadline passes before this event fires first
            if let Some(deadline) = session.aggregator().pending_deadline() {
                let at = view.started_at + event.offset_ms as i64;
                if deadline <= at {
                    clock.set(deadline);
                    outcomes.extend(session.poll());
                }
            }

            clock.set(view.started_at + event.offset_ms as i64);
            if let Err(e) = session.record(&event.vital) {
                tracing::warn!("Skipping event {}: {}", event.vital.name, e);
                summary.skipped_events += 1;
            }
        }

        if let Some(deadline) = session.aggregator().pending_deadline() {
            clock.set(deadline);
            outcomes.extend(session.poll());
        }
        outcomes.extend(session.finish());

        for outcome in outcomes {
            summary.reports += 1;
            summary.anomalies += outcome.anomalies.len();
            summary.regressions += usize::from(outcome.regression.is_some());
            summary.cache_keys.extend(outcome.cache_key);
        }
    }

    tracing::info!(
        "Replayed {} page views into {} reports",
        summary.page_views,
        summary.reports
    );
    Ok(summary)
}

pub fn execute(
    file: &Path,
    cache_dir: &Path,
    config: &TelemetryConfig,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!("Replaying recording: {}", file.display());

    let summary = replay(file, cache_dir, config)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Table => {
            println!("Metric,Value");
            println!("Page Views,{}", summary.page_views);
            println!("Reports,{}", summary.reports);
            println!("Skipped Events,{}", summary.skipped_events);
            println!("Anomalies,{}", summary.anomalies);
            println!("Regressions,{}", summary.regressions);
        }
        OutputFormat::Pretty => {
            use console::style;

            println!("\n{}", style("Ingest Summary").bold().cyan());
            println!("{}", style("==============").cyan());
            println!("  Page Views:     {}", summary.page_views);
            println!("  Reports:        {}", summary.reports);
            println!("  Skipped Events: {}", summary.skipped_events);
            println!("  Anomalies:      {}", style(summary.anomalies).yellow());
            println!("  Regressions:    {}", style(summary.regressions).red());
            println!("  Cache:          {}", cache_dir.display());
            println!();
        }
    }

    Ok(())
}
