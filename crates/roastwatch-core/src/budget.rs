use crate::vitals::{Metric, VitalName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-vital limits a report is checked against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceBudget {
    pub limits: BTreeMap<VitalName, f64>,
}

impl Default for PerformanceBudget {
    /// Budget at the "good" threshold of every vital
    fn default() -> Self {
        let limits = VitalName::ALL
            .iter()
            .map(|name| (*name, name.thresholds().good))
            .collect();
        Self { limits }
    }
}

impl PerformanceBudget {
    pub fn limit(&self, name: VitalName) -> Option<f64> {
        self.limits.get(&name).copied()
    }

    /// Compare the measured vitals of a page view against the budget
    pub fn evaluate(&self, metrics: &BTreeMap<VitalName, Option<Metric>>) -> BudgetStatus {
        let mut measured = 0usize;
        let mut exceeded_metrics = Vec::new();

        for (name, metric) in metrics {
            let (Some(metric), Some(limit)) = (metric, self.limit(*name)) else {
                continue;
            };
            measured += 1;
            if metric.value > limit {
                exceeded_metrics.push(*name);
            }
        }

        let budget_score = if measured == 0 {
            100.0
        } else {
            let within = (measured - exceeded_metrics.len()) as f64;
            (within / measured as f64 * 100.0).round()
        };

        BudgetStatus {
            is_within_budget: exceeded_metrics.is_empty(),
            exceeded_metrics,
            budget_score,
        }
    }
}

/// Outcome of a budget check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStatus {
    pub is_within_budget: bool,
    pub exceeded_metrics: Vec<VitalName>,
    pub budget_score: f64,
}

impl Default for BudgetStatus {
    fn default() -> Self {
        Self {
            is_within_budget: true,
            exceeded_metrics: Vec::new(),
            budget_score: 100.0,
        }
    }
}

impl BudgetStatus {
    pub fn violations(&self) -> usize {
        self.exceeded_metrics.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(name: VitalName, value: f64) -> Option<Metric> {
        Some(Metric {
            name,
            value,
            delta: value,
            id: String::new(),
            timestamp: 0,
            url: String::new(),
            user_agent: String::new(),
            session_id: None,
            connection_type: None,
        })
    }

    #[test]
    fn test_budget_counts_only_measured_vitals() {
        let mut metrics = BTreeMap::new();
        metrics.insert(VitalName::Lcp, metric(VitalName::Lcp, 3000.0));
        metrics.insert(VitalName::Cls, metric(VitalName::Cls, 0.05));
        metrics.insert(VitalName::Inp, None);

        let status = PerformanceBudget::default().evaluate(&metrics);
        assert!(!status.is_within_budget);
        assert_eq!(status.exceeded_metrics, vec![VitalName::Lcp]);
        assert_eq!(status.budget_score, 50.0);
    }

    #[test]
    fn test_empty_report_is_within_budget() {
        let status = PerformanceBudget::default().evaluate(&BTreeMap::new());
        assert!(status.is_within_budget);
        assert_eq!(status.budget_score, 100.0);
    }
}
