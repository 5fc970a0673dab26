use super::anomaly::AlertContext;
use super::mean;
use crate::report::Report;
use crate::vitals::VitalName;
use serde::{Deserialize, Serialize};

pub const BASELINE_WINDOW: usize = 5;
pub const MIN_BASELINE_SAMPLES: usize = 3;
/// A value must exceed the baseline by strictly more than this fraction
pub const REGRESSION_THRESHOLD: f64 = 0.20;
/// Rounding slack on the increase ratio; decimal CLS values land a few ulps off
const RATIO_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressedMetric {
    pub metric: VitalName,
    pub current: f64,
    pub baseline: f64,
    pub increase_percent: f64,
}

/// All vitals of one page view that regressed, reported together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Regression {
    pub metrics: Vec<RegressedMetric>,
    pub baseline_reports: usize,
    pub context: AlertContext,
}

pub struct RegressionDetector {
    window: usize,
    min_samples: usize,
    threshold: f64,
}

impl Default for RegressionDetector {
    fn default() -> Self {
        Self {
            window: BASELINE_WINDOW,
            min_samples: MIN_BASELINE_SAMPLES,
            threshold: REGRESSION_THRESHOLD,
        }
    }
}

impl RegressionDetector {
    /// Compare `current` against the reports that immediately precede it
    pub fn detect(&self, current: &Report, history: &[Report]) -> Option<Regression> {
        let mut preceding: Vec<&Report> = history
            .iter()
            .filter(|r| r.timestamp < current.timestamp && r.page_load_id != current.page_load_id)
            .collect();
        preceding.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        preceding.truncate(self.window);

        let mut regressed = Vec::new();
        for metric in current.measured() {
            let baseline_values: Vec<f64> =
                preceding.iter().filter_map(|r| r.value(metric.name)).collect();
            if baseline_values.len() < self.min_samples {
                continue;
            }

            let baseline = mean(&baseline_values);
            if baseline <= 0.0 {
                continue;
            }

            let increase = (metric.value - baseline) / baseline;
            if increase - self.threshold > RATIO_EPSILON {
                regressed.push(RegressedMetric {
                    metric: metric.name,
                    current: metric.value,
                    baseline,
                    increase_percent: increase * 100.0,
                });
            }
        }

        if regressed.is_empty() {
            return None;
        }

        tracing::debug!(
            "Regression in {} metric(s) against {} preceding reports",
            regressed.len(),
            preceding.len()
        );

        Some(Regression {
            metrics: regressed,
            baseline_reports: preceding.len(),
            context: AlertContext::from_report(current),
        })
    }
}
