use crate::backend::{Breadcrumb, Level, Measurement, MonitoringBackend};
use roastwatch_core::analysis::{AlertContext, Anomaly, BundleAnalysis, Regression};
use roastwatch_core::bundle::BundleSnapshot;
use roastwatch_core::report::Report;
use roastwatch_core::vitals::{Metric, Rating};
use serde_json::json;
use std::collections::BTreeMap;

/// Never-failing adapter in front of a monitoring backend.
///
/// Without a backend every call is a no-op; the first such call logs one
/// warning. Backend errors are logged and swallowed.
pub struct TelemetrySink {
    backend: Option<Box<dyn MonitoringBackend>>,
    warned_unavailable: bool,
    failures: usize,
}

impl TelemetrySink {
    pub fn new(backend: impl MonitoringBackend + 'static) -> Self {
        Self {
            backend: Some(Box::new(backend)),
            warned_unavailable: false,
            failures: 0,
        }
    }

    /// A sink with no backend attached
    pub fn disabled() -> Self {
        Self {
            backend: None,
            warned_unavailable: false,
            failures: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Number of backend calls that failed and were dropped
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Forward one normalized vital; poor ratings also leave a breadcrumb
    /// and a warning-level message
    pub fn record_metric(&mut self, metric: &Metric) {
        let rating = metric.rating();
        self.with_backend(|backend| {
            backend.set_measurement(Measurement {
                name: metric.name.as_str().to_lowercase(),
                value: metric.value,
                unit: metric.name.unit().to_string(),
            })?;
            backend.set_tag(&format!("{}.rating", metric.name.as_str().to_lowercase()), rating.as_str())?;
            if let Some(session_id) = &metric.session_id {
                backend.set_tag("session_id", session_id)?;
            }
            if let Some(connection) = &metric.connection_type {
                backend.set_tag("connection_type", connection)?;
            }

            if rating == Rating::Poor {
                let mut data = BTreeMap::new();
                data.insert("value".to_string(), json!(metric.value));
                data.insert("url".to_string(), json!(metric.url));
                data.insert("id".to_string(), json!(metric.id));
                backend.add_breadcrumb(Breadcrumb {
                    category: "web-vitals".to_string(),
                    message: format!("Poor {} of {}", metric.name, metric.value),
                    level: Level::Warning,
                    data,
                })?;
                backend.capture_message(
                    &format!(
                        "Poor {} detected: {} exceeds {}",
                        metric.name,
                        metric.value,
                        metric.name.thresholds().poor
                    ),
                    Level::Warning,
                )?;
            }
            Ok(())
        });
    }

    /// Forward the page-level summary of a flushed report
    pub fn record_report(&mut self, report: &Report) {
        self.with_backend(|backend| {
            backend.set_tag("session_id", &report.session_id)?;
            backend.set_tag("page_load_id", &report.page_load_id)?;
            backend.set_tag("connection_type", &report.device_info.connection_type)?;
            backend.set_tag("device.mobile", &report.device_info.is_mobile.to_string())?;
            backend.set_tag("device.low_end", &report.device_info.is_low_end_device.to_string())?;
            backend.set_tag("within_budget", &report.budget_status.is_within_budget.to_string())?;
            backend.set_measurement(Measurement {
                name: "performance_score".to_string(),
                value: report.performance_score(),
                unit: "none".to_string(),
            })?;
            backend.set_measurement(Measurement {
                name: "budget_score".to_string(),
                value: report.budget_status.budget_score,
                unit: "percent".to_string(),
            })?;

            let timings = &report.custom_metrics;
            for (name, value) in [
                ("dns_lookup", timings.dns_lookup),
                ("tcp_connect", timings.tcp_connect),
                ("server_response", timings.server_response),
                ("dom_processing", timings.dom_processing),
                ("load_complete", timings.load_complete),
            ] {
                backend.set_measurement(Measurement {
                    name: name.to_string(),
                    value,
                    unit: "millisecond".to_string(),
                })?;
            }
            Ok(())
        });
    }

    pub fn report_anomaly(&mut self, anomaly: &Anomaly) {
        self.with_backend(|backend| {
            let mut data = context_data(&anomaly.context);
            data.insert("value".to_string(), json!(anomaly.value));
            data.insert("mean".to_string(), json!(anomaly.mean));
            data.insert("std_dev".to_string(), json!(anomaly.std_dev));
            data.insert("deviation_factor".to_string(), json!(anomaly.deviation_factor));
            data.insert("samples".to_string(), json!(anomaly.sample_count));

            backend.add_breadcrumb(Breadcrumb {
                category: "performance.anomaly".to_string(),
                message: format!("Anomalous {}", anomaly.metric),
                level: Level::Warning,
                data,
            })?;
            backend.capture_message(
                &format!(
                    "Performance anomaly: {} of {:.2} is {:.1} standard deviations from mean {:.2}",
                    anomaly.metric, anomaly.value, anomaly.deviation_factor, anomaly.mean
                ),
                Level::Warning,
            )
        });
    }

    /// One error-level alert covering every regressed vital
    pub fn report_regression(&mut self, regression: &Regression) {
        let summary = regression
            .metrics
            .iter()
            .map(|m| format!("{} +{:.1}%", m.metric, m.increase_percent))
            .collect::<Vec<_>>()
            .join(", ");

        self.with_backend(|backend| {
            let mut data = context_data(&regression.context);
            data.insert("baseline_reports".to_string(), json!(regression.baseline_reports));
            for m in &regression.metrics {
                data.insert(
                    m.metric.as_str().to_lowercase(),
                    json!({ "current": m.current, "baseline": m.baseline }),
                );
            }

            backend.add_breadcrumb(Breadcrumb {
                category: "performance.regression".to_string(),
                message: summary.clone(),
                level: Level::Error,
                data,
            })?;
            backend.capture_message(
                &format!("Performance regression detected: {}", summary),
                Level::Error,
            )
        });
    }

    pub fn record_bundle(&mut self, snapshot: &BundleSnapshot, analysis: &BundleAnalysis) {
        self.with_backend(|backend| {
            backend.set_measurement(Measurement {
                name: "bundle.total".to_string(),
                value: snapshot.bundle_size.total as f64,
                unit: "byte".to_string(),
            })?;
            backend.set_measurement(Measurement {
                name: "memory.usage".to_string(),
                value: snapshot.memory_usage.usage_percent,
                unit: "percent".to_string(),
            })?;
            backend.set_measurement(Measurement {
                name: "bundle.score".to_string(),
                value: analysis.score as f64,
                unit: "none".to_string(),
            })?;
            for issue in &analysis.issues {
                backend.add_breadcrumb(Breadcrumb {
                    category: "performance.bundle".to_string(),
                    message: issue.clone(),
                    level: Level::Info,
                    data: BTreeMap::new(),
                })?;
            }
            Ok(())
        });
    }

    fn with_backend<F>(&mut self, f: F)
    where
        F: FnOnce(&mut dyn MonitoringBackend) -> crate::Result<()>,
    {
        let Some(backend) = self.backend.as_mut() else {
            if !self.warned_unavailable {
                tracing::warn!("Monitoring backend not initialized; telemetry will not be forwarded");
                self.warned_unavailable = true;
            }
            return;
        };

        if let Err(e) = f(backend.as_mut()) {
            self.failures += 1;
            tracing::warn!("Dropping telemetry event: {}", e);
        }
    }
}

fn context_data(context: &AlertContext) -> BTreeMap<String, serde_json::Value> {
    let mut data = BTreeMap::new();
    data.insert("session_id".to_string(), json!(context.session_id));
    data.insert("page_load_id".to_string(), json!(context.page_load_id));
    data.insert("url".to_string(), json!(context.url));
    data.insert("navigation_type".to_string(), json!(context.navigation_type));
    data.insert("connection_type".to_string(), json!(context.connection_type));
    data.insert("device_memory".to_string(), json!(context.device_memory));
    data.insert("hardware_concurrency".to_string(), json!(context.hardware_concurrency));
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, SinkEvent};
    use crate::{Error, Result};
    use roastwatch_core::analysis::RegressedMetric;
    use roastwatch_core::vitals::VitalName;

    fn metric(name: VitalName, value: f64) -> Metric {
        Metric {
            name,
            value,
            delta: value,
            id: "v1".to_string(),
            timestamp: 1,
            url: "https://journal.example/".to_string(),
            user_agent: "agent".to_string(),
            session_id: Some("s-1".to_string()),
            connection_type: Some("4g".to_string()),
        }
    }

    struct FailingBackend;

    impl MonitoringBackend for FailingBackend {
        fn set_measurement(&mut self, _: Measurement) -> Result<()> {
            Err(Error::Unavailable("offline".to_string()))
        }
        fn set_tag(&mut self, _: &str, _: &str) -> Result<()> {
            Err(Error::Unavailable("offline".to_string()))
        }
        fn add_breadcrumb(&mut self, _: Breadcrumb) -> Result<()> {
            Err(Error::Unavailable("offline".to_string()))
        }
        fn capture_message(&mut self, _: &str, _: Level) -> Result<()> {
            Err(Error::Unavailable("offline".to_string()))
        }
    }

    #[test]
    fn test_good_metric_has_no_alert() {
        let backend = MemoryBackend::new();
        let mut sink = TelemetrySink::new(backend.clone());
        sink.record_metric(&metric(VitalName::Lcp, 1200.0));

        assert!(backend.messages().is_empty());
        assert_eq!(backend.tag("lcp.rating").as_deref(), Some("good"));
        assert_eq!(backend.tag("session_id").as_deref(), Some("s-1"));
        assert!(backend.events().contains(&SinkEvent::Measurement(Measurement {
            name: "lcp".to_string(),
            value: 1200.0,
            unit: "millisecond".to_string(),
        })));
    }

    #[test]
    fn test_poor_metric_warns() {
        let backend = MemoryBackend::new();
        let mut sink = TelemetrySink::new(backend.clone());
        sink.record_metric(&metric(VitalName::Cls, 0.4));

        let messages = backend.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1, Level::Warning);
        assert!(
            backend
                .events()
                .iter()
                .any(|e| matches!(e, SinkEvent::Breadcrumb(b) if b.category == "web-vitals"))
        );
    }

    #[test]
    fn test_regression_is_one_error_alert() {
        let backend = MemoryBackend::new();
        let mut sink = TelemetrySink::new(backend.clone());
        sink.report_regression(&Regression {
            metrics: vec![
                RegressedMetric {
                    metric: VitalName::Lcp,
                    current: 3000.0,
                    baseline: 2000.0,
                    increase_percent: 50.0,
                },
                RegressedMetric {
                    metric: VitalName::Ttfb,
                    current: 900.0,
                    baseline: 600.0,
                    increase_percent: 50.0,
                },
            ],
            baseline_reports: 5,
            context: AlertContext::default(),
        });

        let messages = backend.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1, Level::Error);
        assert!(messages[0].0.contains("LCP +50.0%"));
        assert!(messages[0].0.contains("TTFB +50.0%"));
    }

    #[test]
    fn test_anomaly_is_warning_with_context() {
        let backend = MemoryBackend::new();
        let mut sink = TelemetrySink::new(backend.clone());
        sink.report_anomaly(&Anomaly {
            metric: VitalName::Inp,
            value: 900.0,
            mean: 200.0,
            std_dev: 100.0,
            deviation_factor: 7.0,
            sample_count: 6,
            context: AlertContext {
                session_id: "s-9".to_string(),
                connection_type: "3g".to_string(),
                device_memory: Some(2.0),
                hardware_concurrency: Some(4),
                navigation_type: Some("reload".to_string()),
                ..Default::default()
            },
        });

        assert_eq!(backend.messages()[0].1, Level::Warning);
        let crumb = backend
            .events()
            .into_iter()
            .find_map(|e| match e {
                SinkEvent::Breadcrumb(b) => Some(b),
                _ => None,
            })
            .unwrap();
        assert_eq!(crumb.data["session_id"], json!("s-9"));
        assert_eq!(crumb.data["navigation_type"], json!("reload"));
        assert_eq!(crumb.data["hardware_concurrency"], json!(4));
        assert_eq!(crumb.data["deviation_factor"], json!(7.0));
    }

    #[test]
    fn test_disabled_sink_is_silent_noop() {
        let mut sink = TelemetrySink::disabled();
        assert!(!sink.is_enabled());
        sink.record_metric(&metric(VitalName::Lcp, 9000.0));
        sink.record_metric(&metric(VitalName::Lcp, 9000.0));
        assert_eq!(sink.failures(), 0);
    }

    #[test]
    fn test_backend_errors_are_contained() {
        let mut sink = TelemetrySink::new(FailingBackend);
        sink.record_metric(&metric(VitalName::Lcp, 9000.0));
        sink.report_regression(&Regression {
            metrics: vec![],
            baseline_reports: 3,
            context: AlertContext::default(),
        });
        assert_eq!(sink.failures(), 2);
    }

    #[test]
    fn test_bundle_sample_forwarded_with_issue_breadcrumbs() {
        let backend = MemoryBackend::new();
        let mut sink = TelemetrySink::new(backend.clone());
        let snapshot = BundleSnapshot {
            bundle_size: roastwatch_core::bundle::BundleSize {
                javascript: 2_500_000,
                total: 2_500_000,
                ..Default::default()
            },
            ..Default::default()
        };
        let analysis = roastwatch_core::analysis::analyze_bundle(&snapshot, None);

        sink.record_bundle(&snapshot, &analysis);

        let events = backend.events();
        assert!(events.contains(&SinkEvent::Measurement(Measurement {
            name: "bundle.total".to_string(),
            value: 2_500_000.0,
            unit: "byte".to_string(),
        })));
        assert!(events.contains(&SinkEvent::Measurement(Measurement {
            name: "bundle.score".to_string(),
            value: 80.0,
            unit: "none".to_string(),
        })));
        let breadcrumbs = events
            .iter()
            .filter(|e| matches!(e, SinkEvent::Breadcrumb(b) if b.category == "performance.bundle"))
            .count();
        assert_eq!(breadcrumbs, analysis.issues.len());
        assert!(backend.messages().is_empty());
    }
}
