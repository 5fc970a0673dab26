use crate::aggregator::MetricAggregator;
use crate::Result;
use roastwatch_core::analysis::{Anomaly, Regression, RumAnalyzer};
use roastwatch_core::cache::{KeyValueStore, ReportCache};
use roastwatch_core::report::Report;
use roastwatch_core::vitals::{Metric, RawVital};
use roastwatch_sink::TelemetrySink;

/// What happened to one flushed report on its way through the session
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutcome {
    pub report: Report,
    pub cache_key: Option<String>,
    pub anomalies: Vec<Anomaly>,
    pub regression: Option<Regression>,
}

/// One page view end to end: debounced aggregation, bounded persistence,
/// alerting against the cached history and forwarding to the sink
pub struct TelemetrySession<S: KeyValueStore> {
    aggregator: MetricAggregator,
    cache: ReportCache<S>,
    sink: TelemetrySink,
}

impl<S: KeyValueStore> TelemetrySession<S> {
    pub fn new(aggregator: MetricAggregator, cache: ReportCache<S>, sink: TelemetrySink) -> Self {
        Self {
            aggregator,
            cache,
            sink,
        }
    }

    pub fn aggregator(&self) -> &MetricAggregator {
        &self.aggregator
    }

    pub fn aggregator_mut(&mut self) -> &mut MetricAggregator {
        &mut self.aggregator
    }

    pub fn cache_mut(&mut self) -> &mut ReportCache<S> {
        &mut self.cache
    }

    pub fn sink(&self) -> &TelemetrySink {
        &self.sink
    }

    /// Normalize and buffer a vital, forwarding it to the sink
    pub fn record(&mut self, raw: &RawVital) -> Result<Metric> {
        let metric = self.aggregator.record(raw)?;
        self.sink.record_metric(&metric);
        Ok(metric)
    }

    /// Process a report if the quiet period has elapsed
    pub fn poll(&mut self) -> Option<ReportOutcome> {
        let report = self.aggregator.poll()?;
        Some(self.process(report))
    }

    pub fn flush(&mut self) -> Option<ReportOutcome> {
        let report = self.aggregator.flush()?;
        Some(self.process(report))
    }

    /// End the page view, processing whatever was still pending
    pub fn finish(self) -> Option<ReportOutcome> {
        let Self {
            aggregator,
            mut cache,
            mut sink,
        } = self;
        let report = aggregator.teardown()?;
        Some(process(&mut cache, &mut sink, report))
    }

    fn process(&mut self, report: Report) -> ReportOutcome {
        process(&mut self.cache, &mut self.sink, report)
    }
}

fn process<S: KeyValueStore>(
    cache: &mut ReportCache<S>,
    sink: &mut TelemetrySink,
    report: Report,
) -> ReportOutcome {
    let cache_key = match cache.save(&report) {
        Ok(key) => Some(key),
        Err(e) => {
            tracing::warn!("Failed to cache report: {}", e);
            None
        }
    };

    let history = cache.load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load cached reports: {}", e);
        Vec::new()
    });
    let analyzer = RumAnalyzer::new(history);

    sink.record_report(&report);

    let anomalies = analyzer.detect_anomalies(&report);
    for anomaly in &anomalies {
        sink.report_anomaly(anomaly);
    }

    let regression = analyzer.detect_regression(&report);
    if let Some(regression) = &regression {
        sink.report_regression(regression);
    }

    if !anomalies.is_empty() || regression.is_some() {
        tracing::info!(
            "Report {} raised {} anomalies{}",
            report.page_load_id,
            anomalies.len(),
            if regression.is_some() { " and a regression" } else { "" }
        );
    }

    ReportOutcome {
        report,
        cache_key,
        anomalies,
        regression,
    }
}
