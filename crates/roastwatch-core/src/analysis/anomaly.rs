use crate::report::Report;
use crate::vitals::VitalName;
use serde::{Deserialize, Serialize};

/// Fewer historical samples than this and a metric is not tested
pub const MIN_SAMPLES: usize = 3;
/// Deviation, in standard deviations, beyond which a value is anomalous
pub const Z_THRESHOLD: f64 = 2.0;

/// Page-view context attached to every alert
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertContext {
    pub session_id: String,
    pub page_load_id: String,
    pub url: String,
    pub navigation_type: Option<String>,
    pub connection_type: String,
    pub device_memory: Option<f64>,
    pub hardware_concurrency: Option<u32>,
}

impl AlertContext {
    pub fn from_report(report: &Report) -> Self {
        Self {
            session_id: report.session_id.clone(),
            page_load_id: report.page_load_id.clone(),
            url: report.url.clone(),
            navigation_type: report.navigation_type().map(str::to_string),
            connection_type: report.device_info.connection_type.clone(),
            device_memory: report.device_info.device_memory,
            hardware_concurrency: report.device_info.hardware_concurrency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub metric: VitalName,
    pub value: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// |value - mean| / std_dev
    pub deviation_factor: f64,
    pub sample_count: usize,
    pub context: AlertContext,
}

/// Mean and population standard deviation
pub fn population_stats(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

/// Z-score outlier test of a page view's vitals against history
pub struct AnomalyDetector {
    min_samples: usize,
    threshold: f64,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self {
            min_samples: MIN_SAMPLES,
            threshold: Z_THRESHOLD,
        }
    }
}

impl AnomalyDetector {
    pub fn new(min_samples: usize, threshold: f64) -> Self {
        Self {
            min_samples: min_samples.max(MIN_SAMPLES),
            threshold,
        }
    }

    /// Test every measured vital of `current` against same-named values in `history`.
    ///
    /// `history` must not contain `current` itself.
    pub fn detect(&self, current: &Report, history: &[Report]) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();

        for metric in current.measured() {
            let samples: Vec<f64> = history.iter().filter_map(|r| r.value(metric.name)).collect();
            if samples.len() < self.min_samples {
                continue;
            }
            let Some((mean, std_dev)) = population_stats(&samples) else {
                continue;
            };
            if std_dev <= 0.0 {
                continue;
            }

            let distance = (metric.value - mean).abs();
            if distance > self.threshold * std_dev {
                tracing::debug!(
                    "Anomalous {}: {} vs mean {:.2} (sd {:.2})",
                    metric.name,
                    metric.value,
                    mean,
                    std_dev
                );
                anomalies.push(Anomaly {
                    metric: metric.name,
                    value: metric.value,
                    mean,
                    std_dev,
                    deviation_factor: distance / std_dev,
                    sample_count: samples.len(),
                    context: AlertContext::from_report(current),
                });
            }
        }

        anomalies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::report;

    fn history(values: &[f64]) -> Vec<Report> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| report(i as i64, &[(VitalName::Lcp, *v)]))
            .collect()
    }

    #[test]
    fn test_two_samples_never_flag() {
        let current = report(100, &[(VitalName::Lcp, 1_000_000.0)]);
        let anomalies = AnomalyDetector::default().detect(&current, &history(&[1000.0, 1200.0]));
        assert!(anomalies.is_empty());
    }

    #[test]
    fn test_flags_beyond_two_sigma() {
        // mean 2000, population sd 100
        let past = history(&[1900.0, 2100.0, 1900.0, 2100.0]);

        let at_boundary = report(100, &[(VitalName::Lcp, 2200.0)]);
        assert!(AnomalyDetector::default().detect(&at_boundary, &past).is_empty());

        let mut outlier = report(101, &[(VitalName::Lcp, 2250.0)]);
        outlier.device_info.device_memory = Some(4.0);
        outlier.device_info.hardware_concurrency = Some(8);
        let anomalies = AnomalyDetector::default().detect(&outlier, &past);
        assert_eq!(anomalies.len(), 1);
        let anomaly = &anomalies[0];
        assert_eq!(anomaly.metric, VitalName::Lcp);
        assert_eq!(anomaly.mean, 2000.0);
        assert_eq!(anomaly.std_dev, 100.0);
        assert_eq!(anomaly.deviation_factor, 2.5);
        assert_eq!(anomaly.sample_count, 4);
        assert_eq!(anomaly.context.session_id, "session-101");
        assert_eq!(anomaly.context.device_memory, Some(4.0));
        assert_eq!(anomaly.context.hardware_concurrency, Some(8));

        let faster = report(102, &[(VitalName::Lcp, 1700.0)]);
        assert_eq!(AnomalyDetector::default().detect(&faster, &past).len(), 1);
    }

    #[test]
    fn test_zero_variance_never_flags() {
        let past = history(&[1500.0, 1500.0, 1500.0]);
        let current = report(100, &[(VitalName::Lcp, 9000.0)]);
        assert!(AnomalyDetector::default().detect(&current, &past).is_empty());
    }

    #[test]
    fn test_other_metrics_do_not_count_as_samples() {
        let past = vec![
            report(1, &[(VitalName::Cls, 0.1)]),
            report(2, &[(VitalName::Cls, 0.2)]),
            report(3, &[(VitalName::Lcp, 1000.0), (VitalName::Cls, 0.1)]),
        ];
        let current = report(100, &[(VitalName::Lcp, 50_000.0), (VitalName::Cls, 0.9)]);

        let anomalies = AnomalyDetector::default().detect(&current, &past);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].metric, VitalName::Cls);
    }

    #[test]
    fn test_population_stats() {
        assert_eq!(population_stats(&[]), None);
        assert_eq!(population_stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), Some((5.0, 2.0)));
    }
}
