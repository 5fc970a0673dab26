use assert_cmd::Command;
use predicates::prelude::*;
use roastwatch_core::config::TelemetryConfig;
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

/// Copy the fixture cache so loading can prune malformed entries
fn cache_copy() -> TempDir {
    let dir = TempDir::new().unwrap();
    for entry in std::fs::read_dir(fixture("cache")).unwrap() {
        let path = entry.unwrap().path();
        std::fs::copy(&path, dir.path().join(path.file_name().unwrap())).unwrap();
    }
    dir
}

#[allow(deprecated)]
fn roastwatch() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin("roastwatch"))
}

#[test]
fn test_analyze_cache_skips_malformed_entry() {
    let cache = cache_copy();

    let analysis =
        roastwatch_cli::commands::analyze::analyze_cache(cache.path(), None, &TelemetryConfig::default())
            .unwrap();

    assert_eq!(analysis.report_count, 6);
    assert_eq!(analysis.device_insights.mobile_percent, 33.3);
    assert_eq!(analysis.device_insights.low_end_percent, 33.3);
    assert_eq!(analysis.user_behavior.sessions_analyzed, 6);
    assert!(!analysis.recommendations.is_empty());
    assert!(analysis.bundle_trend.is_none());

    assert!(!cache.path().join("perf_1704100000000.json").exists());
}

#[test]
fn test_analyze_cache_with_bundle_history() {
    let cache = cache_copy();

    let analysis = roastwatch_cli::commands::analyze::analyze_cache(
        cache.path(),
        Some(&fixture("bundle-history.json")),
        &TelemetryConfig::default(),
    )
    .unwrap();

    let trend = analysis.bundle_trend.unwrap();
    assert_eq!(trend.snapshots, 3);
    assert_eq!(trend.size_change_percent, 20.0);
}

#[test]
fn test_problem_page_is_ethiopia() {
    let cache = cache_copy();
    let analysis =
        roastwatch_cli::commands::analyze::analyze_cache(cache.path(), None, &TelemetryConfig::default())
            .unwrap();

    let worst = &analysis.bottlenecks.problem_pages[0];
    assert_eq!(worst.path, "/beans/ethiopia");
    assert_eq!(worst.views, 2);
}

#[test]
fn test_analyze_command_json_output() {
    let cache = cache_copy();

    roastwatch()
        .arg("analyze")
        .arg(cache.path())
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"reportCount\": 6"))
        .stdout(predicate::str::contains("\"recommendations\""));
}

#[test]
fn test_analyze_command_pretty_output() {
    let cache = cache_copy();

    roastwatch()
        .arg("analyze")
        .arg(cache.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("RUM Analysis Report"))
        .stdout(predicate::str::contains("Problem Pages:"))
        .stdout(predicate::str::contains("/beans/ethiopia"));
}

#[test]
fn test_analyze_empty_cache() {
    let cache = TempDir::new().unwrap();

    roastwatch()
        .args(["--format", "table", "analyze"])
        .arg(cache.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Reports,0"))
        .stdout(predicate::str::contains("Trend,stable"));
}

#[test]
fn test_analyze_rejects_invalid_config() {
    let cache = cache_copy();
    let config_dir = TempDir::new().unwrap();
    let config = config_dir.path().join("config.json");
    std::fs::write(&config, r#"{"debounce_ms": 0}"#).unwrap();

    roastwatch()
        .arg("--config")
        .arg(&config)
        .arg("analyze")
        .arg(cache.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}
