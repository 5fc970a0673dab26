use roastwatch_collector::{MetricAggregator, StaticEnvironment, TelemetrySession};
use roastwatch_core::cache::{FileStore, ReportCache};
use roastwatch_core::clock::ManualClock;
use roastwatch_core::config::TelemetryConfig;
use roastwatch_core::vitals::{RawVital, VitalName};
use roastwatch_sink::{Level, MemoryBackend, TelemetrySink};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Harness {
    dir: TempDir,
    clock: ManualClock,
    env: StaticEnvironment,
    backend: MemoryBackend,
}

impl Harness {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            clock: ManualClock::new(1_704_067_200_000),
            env: StaticEnvironment::new("https://journal.example/brews/42", "Mozilla/5.0 (X11; Linux)"),
            backend: MemoryBackend::new(),
        }
    }

    fn session(&self) -> TelemetrySession<FileStore> {
        let config = TelemetryConfig::default();
        let aggregator = MetricAggregator::new(
            Arc::new(self.env.clone()),
            Arc::new(self.clock.clone()),
            &config,
        )
        .with_session_id("session-test");
        let cache = ReportCache::new(FileStore::open(self.dir.path()).unwrap());
        TelemetrySession::new(aggregator, cache, TelemetrySink::new(self.backend.clone()))
    }

    fn page_view(&self, lcp: f64) -> roastwatch_collector::ReportOutcome {
        let mut session = self.session();
        session.record(&RawVital::new("LCP", lcp)).unwrap();
        self.clock.advance(Duration::from_secs(5));
        let outcome = session.poll().unwrap();
        self.clock.advance(Duration::from_secs(60));
        outcome
    }
}

fn cached_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[test]
fn test_stable_history_raises_no_alerts() {
    let harness = Harness::new();
    for lcp in [2000.0, 2100.0, 1900.0, 2000.0, 2000.0] {
        let outcome = harness.page_view(lcp);
        assert!(outcome.anomalies.is_empty());
        assert!(outcome.regression.is_none());
        assert!(outcome.cache_key.unwrap().starts_with("perf_"));
    }

    assert!(harness.backend.messages().is_empty());
    assert_eq!(cached_files(harness.dir.path()), 5);
}

#[test]
fn test_slow_page_view_alerts() {
    let harness = Harness::new();
    for lcp in [2000.0, 2100.0, 1900.0, 2000.0, 2000.0] {
        harness.page_view(lcp);
    }

    let outcome = harness.page_view(5000.0);

    assert_eq!(outcome.anomalies.len(), 1);
    assert_eq!(outcome.anomalies[0].metric, VitalName::Lcp);
    assert_eq!(outcome.anomalies[0].sample_count, 5);
    assert_eq!(outcome.anomalies[0].context.session_id, "session-test");

    let regression = outcome.regression.unwrap();
    assert_eq!(regression.metrics.len(), 1);
    assert_eq!(regression.metrics[0].baseline, 2000.0);

    let levels: Vec<Level> = harness.backend.messages().into_iter().map(|(_, l)| l).collect();
    assert_eq!(levels, vec![Level::Warning, Level::Warning, Level::Error]);
}

#[test]
fn test_cache_keeps_ten_most_recent() {
    let harness = Harness::new();
    let mut keys = Vec::new();
    for i in 0..12 {
        keys.push(harness.page_view(1000.0 + i as f64).cache_key.unwrap());
    }

    assert_eq!(cached_files(harness.dir.path()), 10);

    let mut cache = ReportCache::new(FileStore::open(harness.dir.path()).unwrap());
    let reports = cache.load().unwrap();
    assert_eq!(reports.len(), 10);
    assert_eq!(reports[0].value(VitalName::Lcp), Some(1011.0));
    assert_eq!(reports[9].value(VitalName::Lcp), Some(1002.0));
    assert_eq!(cache.key_for(&reports[0]), keys[11]);
}

#[test]
fn test_finish_processes_pending_report() {
    let harness = Harness::new();
    let mut session = harness.session();
    session.record(&RawVital::new("CLS", 0.05)).unwrap();

    let outcome = session.finish().unwrap();
    assert_eq!(outcome.report.value(VitalName::Cls), Some(0.05));
    assert_eq!(cached_files(harness.dir.path()), 1);
}

#[test]
fn test_disabled_sink_still_caches() {
    let harness = Harness::new();
    let aggregator = MetricAggregator::new(
        Arc::new(harness.env.clone()),
        Arc::new(harness.clock.clone()),
        &TelemetryConfig::default(),
    );
    let cache = ReportCache::new(FileStore::open(harness.dir.path()).unwrap());
    let mut session = TelemetrySession::new(aggregator, cache, TelemetrySink::disabled());

    session.record(&RawVital::new("LCP", 9000.0)).unwrap();
    assert!(session.flush().is_some());
    assert!(!session.sink().is_enabled());
    assert_eq!(cached_files(harness.dir.path()), 1);
}
