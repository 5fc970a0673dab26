mod anomaly;
mod behavior;
mod bottlenecks;
mod bundle;
mod devices;
mod recommendations;
mod regression;
mod rum;
mod trend;

pub use anomaly::{AlertContext, Anomaly, AnomalyDetector, population_stats};
pub use behavior::{BehaviorAnalyzer, UserBehavior};
pub use bottlenecks::{BottleneckAnalyzer, Bottlenecks, HourlyScore, MetricAverage, PageBottleneck};
pub use bundle::{BundleAnalysis, BundleDeltas, BundleRating, BundleTrend, analyze_bundle, bundle_trend};
pub use devices::{DeviceAnalyzer, DeviceInsights, PlatformShare};
pub use recommendations::recommend;
pub use regression::{RegressedMetric, Regression, RegressionDetector};
pub use rum::{RumAnalysis, RumAnalyzer};
pub use trend::{TrendAnalyzer, TrendDirection, TrendSummary};

use crate::report::Report;
use serde::{Deserialize, Serialize};

/// A computation over report history.
///
/// Implementations expect `reports` ordered most recent first and never fail:
/// missing data yields empty or zero results.
pub trait Analyzer {
    type Output;

    fn analyze(&self, reports: &[Report]) -> Self::Output;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub category: String,
    pub title: String,
    pub description: String,
}

impl Recommendation {
    pub fn new(
        priority: Priority,
        category: &str,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            priority,
            category: category.to_string(),
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Sort highest priority first, keeping rule order within a priority
pub(crate) fn sort_by_priority(recommendations: &mut [Recommendation]) {
    recommendations.sort_by(|a, b| b.priority.cmp(&a.priority));
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub(crate) fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
