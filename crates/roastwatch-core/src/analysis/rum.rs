use super::anomaly::{Anomaly, AnomalyDetector};
use super::behavior::{BehaviorAnalyzer, UserBehavior};
use super::bottlenecks::{BottleneckAnalyzer, Bottlenecks};
use super::bundle::{BundleTrend, bundle_trend};
use super::devices::{DeviceAnalyzer, DeviceInsights};
use super::recommendations::recommend;
use super::regression::{Regression, RegressionDetector};
use super::trend::{TrendAnalyzer, TrendSummary};
use super::{Analyzer, Recommendation};
use crate::bundle::BundleSnapshot;
use crate::report::Report;
use serde::{Deserialize, Serialize};

/// Complete real-user-monitoring analysis of a report history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RumAnalysis {
    pub report_count: usize,
    pub trend: TrendSummary,
    pub user_behavior: UserBehavior,
    pub device_insights: DeviceInsights,
    pub bottlenecks: Bottlenecks,
    pub recommendations: Vec<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_trend: Option<BundleTrend>,
}

/// Read-only analysis over a snapshot of report history.
///
/// Every query is recomputed from the reports it was built with.
pub struct RumAnalyzer {
    reports: Vec<Report>,
    bundle_history: Vec<BundleSnapshot>,
}

impl RumAnalyzer {
    pub fn new(mut reports: Vec<Report>) -> Self {
        reports.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Self {
            reports,
            bundle_history: Vec::new(),
        }
    }

    /// Attach resource-monitor history (oldest first)
    pub fn with_bundle_history(mut self, history: Vec<BundleSnapshot>) -> Self {
        self.bundle_history = history;
        self
    }

    /// Reports, most recent first
    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn trend(&self) -> TrendSummary {
        TrendAnalyzer::default().analyze(&self.reports)
    }

    pub fn user_behavior(&self) -> UserBehavior {
        BehaviorAnalyzer.analyze(&self.reports)
    }

    pub fn device_insights(&self) -> DeviceInsights {
        DeviceAnalyzer.analyze(&self.reports)
    }

    pub fn bottlenecks(&self) -> Bottlenecks {
        BottleneckAnalyzer::default().analyze(&self.reports)
    }

    pub fn bundle_trend(&self) -> Option<BundleTrend> {
        bundle_trend(&self.bundle_history)
    }

    pub fn recommendations(&self) -> Vec<Recommendation> {
        recommend(
            &self.trend(),
            &self.user_behavior(),
            &self.device_insights(),
            &self.bottlenecks(),
        )
    }

    pub fn analyze(&self) -> RumAnalysis {
        tracing::debug!("Running RUM analysis over {} reports", self.reports.len());

        let trend = self.trend();
        let user_behavior = self.user_behavior();
        let device_insights = self.device_insights();
        let bottlenecks = self.bottlenecks();
        let recommendations = recommend(&trend, &user_behavior, &device_insights, &bottlenecks);

        tracing::info!(
            "RUM analysis complete: score={:.1} trend={:?} recommendations={}",
            trend.score,
            trend.trend,
            recommendations.len()
        );

        RumAnalysis {
            report_count: self.reports.len(),
            trend,
            user_behavior,
            device_insights,
            bottlenecks,
            recommendations,
            bundle_trend: self.bundle_trend(),
        }
    }

    /// Z-score test of a page view against the history, excluding the page view itself
    pub fn detect_anomalies(&self, current: &Report) -> Vec<Anomaly> {
        let history = self.history_without(current);
        AnomalyDetector::default().detect(current, &history)
    }

    /// Compare a page view against the reports preceding it
    pub fn detect_regression(&self, current: &Report) -> Option<Regression> {
        RegressionDetector::default().detect(current, &self.reports)
    }

    fn history_without(&self, current: &Report) -> Vec<Report> {
        self.reports
            .iter()
            .filter(|r| r.page_load_id != current.page_load_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Priority, TrendDirection};
    use crate::report::fixtures::{report, report_with_score};
    use crate::vitals::VitalName;

    #[test]
    fn test_reports_sorted_most_recent_first() {
        let analyzer = RumAnalyzer::new(vec![report(1, &[]), report(3, &[]), report(2, &[])]);
        let order: Vec<i64> = analyzer.reports().iter().map(|r| r.timestamp).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn test_unsorted_input_yields_same_trend() {
        let mut reports: Vec<Report> = (0..10)
            .map(|i| report_with_score(1000 + i, if i >= 5 { 90 } else { 50 }))
            .collect();
        reports.reverse();
        reports.swap(0, 7);

        let trend = RumAnalyzer::new(reports).trend();
        assert_eq!(trend.trend, TrendDirection::Improving);
        assert_eq!(trend.change, 40.0);
    }

    #[test]
    fn test_empty_analysis() {
        let analysis = RumAnalyzer::new(Vec::new()).analyze();
        assert_eq!(analysis.report_count, 0);
        assert_eq!(analysis.trend.score, 0.0);
        assert_eq!(analysis.trend.trend, TrendDirection::Stable);
        assert_eq!(analysis.recommendations.len(), 1);
        assert_eq!(analysis.recommendations[0].priority, Priority::Low);
        assert!(analysis.bundle_trend.is_none());
    }

    #[test]
    fn test_anomaly_excludes_current_report() {
        let history: Vec<Report> = [1000.0, 1100.0, 900.0]
            .iter()
            .enumerate()
            .map(|(i, v)| report(i as i64, &[(VitalName::Lcp, *v)]))
            .collect();
        let current = report(10, &[(VitalName::Lcp, 5000.0)]);

        let mut all = history.clone();
        all.push(current.clone());
        let analyzer = RumAnalyzer::new(all);

        let anomalies = analyzer.detect_anomalies(&current);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].sample_count, 3);
    }

    #[test]
    fn test_regression_via_analyzer() {
        let mut reports: Vec<Report> = (1..=5).map(|ts| report(ts, &[(VitalName::Inp, 100.0)])).collect();
        let current = report(6, &[(VitalName::Inp, 300.0)]);
        reports.push(current.clone());

        let regression = RumAnalyzer::new(reports).detect_regression(&current).unwrap();
        assert_eq!(regression.metrics[0].metric, VitalName::Inp);
        assert_eq!(regression.baseline_reports, 5);
    }
}
