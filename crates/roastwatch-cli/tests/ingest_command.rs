use assert_cmd::Command;
use predicates::prelude::*;
use roastwatch_core::cache::{FileStore, ReportCache};
use roastwatch_core::config::TelemetryConfig;
use roastwatch_core::vitals::{Rating, VitalName};
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[allow(deprecated)]
fn roastwatch() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin("roastwatch"))
}

#[test]
fn test_replay_debounces_page_views() {
    let cache = TempDir::new().unwrap();

    let summary = roastwatch_cli::commands::ingest::replay(
        &fixture("recording.json"),
        cache.path(),
        &TelemetryConfig::default(),
    )
    .unwrap();

    assert_eq!(summary.page_views, 2);
    assert_eq!(summary.reports, 3);
    assert_eq!(summary.skipped_events, 1);
    assert_eq!(summary.anomalies, 0);
    assert_eq!(summary.regressions, 0);
    assert_eq!(
        summary.cache_keys,
        vec![
            "perf_1704103207600".to_string(),
            "perf_1704103226000".to_string(),
            "perf_1704106806600".to_string(),
        ]
    );
}

#[test]
fn test_replayed_report_keeps_latest_value() {
    let cache = TempDir::new().unwrap();
    roastwatch_cli::commands::ingest::replay(
        &fixture("recording.json"),
        cache.path(),
        &TelemetryConfig::default(),
    )
    .unwrap();

    let mut reports = ReportCache::new(FileStore::open(cache.path()).unwrap());
    let reports = reports.load().unwrap();
    let first = reports.last().unwrap();

    let lcp = first.metric(VitalName::Lcp).unwrap();
    assert_eq!(lcp.value, 3200.0);
    assert_eq!(lcp.rating(), Rating::NeedsImprovement);
    assert_eq!(first.session_id, "session-replay");
    assert!(first.device_info.is_mobile);
    assert_eq!(first.device_info.connection_type, "4g");
    assert_eq!(first.custom_metrics.dns_lookup, 20.0);
    assert_eq!(first.user_interactions.as_ref().unwrap().click_count, 4);
    assert!(first.metric(VitalName::Cls).is_none());

    let second = &reports[1];
    assert_eq!(second.page_load_id, first.page_load_id);
    assert_eq!(second.value(VitalName::Cls), Some(0.04));
    assert_eq!(second.value(VitalName::Lcp), Some(3200.0));
}

#[test]
fn test_ingest_command_honors_config() {
    let cache = TempDir::new().unwrap();

    roastwatch()
        .arg("--config")
        .arg(fixture("config.json"))
        .args(["--format", "json", "ingest"])
        .arg(fixture("recording.json"))
        .arg("--cache")
        .arg(cache.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"reports\": 3"))
        .stdout(predicate::str::contains("perf_1704103204600"));
}
