use crate::budget::BudgetStatus;
use crate::timing::{CustomMetrics, NavigationTiming};
use crate::vitals::{Metric, VitalName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// One aggregated report per page view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub timestamp: i64,
    pub url: String,
    pub session_id: String,
    pub page_load_id: String,
    pub metrics: BTreeMap<VitalName, Option<Metric>>,
    #[serde(default)]
    pub custom_metrics: CustomMetrics,
    #[serde(default)]
    pub device_info: DeviceInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_interactions: Option<UserInteractions>,
    #[serde(default)]
    pub budget_status: BudgetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_timing: Option<NavigationTiming>,
}

impl Report {
    pub fn metric(&self, name: VitalName) -> Option<&Metric> {
        self.metrics.get(&name).and_then(Option::as_ref)
    }

    pub fn value(&self, name: VitalName) -> Option<f64> {
        self.metric(name).map(|m| m.value)
    }

    /// Iterate over the vitals that were actually measured
    pub fn measured(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.values().filter_map(Option::as_ref)
    }

    /// Mean rating points over measured vitals (0 when nothing was measured)
    pub fn performance_score(&self) -> f64 {
        let (sum, count) = self
            .measured()
            .fold((0.0, 0usize), |(sum, count), m| (sum + m.rating().points(), count + 1));
        if count == 0 { 0.0 } else { sum / count as f64 }
    }

    /// URL path used to group page views
    pub fn path(&self) -> String {
        match Url::parse(&self.url) {
            Ok(url) => url.path().to_string(),
            Err(_) => self
                .url
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }

    pub fn navigation_type(&self) -> Option<&str> {
        self.navigation_timing
            .as_ref()
            .and_then(|t| t.navigation_type.as_deref())
            .or(self.device_info.navigation_type.as_deref())
    }
}

/// Device and network snapshot taken when the report is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceInfo {
    pub user_agent: String,
    pub platform: String,
    pub is_mobile: bool,
    pub is_low_end_device: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_memory: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware_concurrency: Option<u32>,
    pub connection_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport_height: Option<u32>,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            user_agent: String::new(),
            platform: "unknown".to_string(),
            is_mobile: false,
            is_low_end_device: false,
            device_memory: None,
            hardware_concurrency: None,
            connection_type: "unknown".to_string(),
            effective_type: None,
            navigation_type: None,
            viewport_width: None,
            viewport_height: None,
        }
    }
}

impl DeviceInfo {
    /// Low-end heuristic: at most 2 GB of memory or at most 2 cores
    pub fn classify_low_end(device_memory: Option<f64>, hardware_concurrency: Option<u32>) -> bool {
        device_memory.is_some_and(|gb| gb <= 2.0) || hardware_concurrency.is_some_and(|c| c <= 2)
    }

    /// Mobile heuristic over the user agent string
    pub fn classify_mobile(user_agent: &str) -> bool {
        let ua = user_agent.to_lowercase();
        ["mobile", "android", "iphone", "ipad", "ipod"]
            .iter()
            .any(|token| ua.contains(token))
    }
}

/// Interaction counters for the page view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInteractions {
    pub click_count: u32,
    /// Deepest scroll position reached, as a percentage of the page
    pub scroll_depth: f64,
    /// Milliseconds since navigation
    pub time_on_page: f64,
    pub engagement_score: f64,
}

impl UserInteractions {
    pub fn new(click_count: u32, scroll_depth: f64, time_on_page: f64) -> Self {
        let engagement_score = engagement_score(click_count, scroll_depth, time_on_page);
        Self {
            click_count,
            scroll_depth,
            time_on_page,
            engagement_score,
        }
    }
}

/// 0-100 engagement: clicks, scroll depth and dwell time (capped at 5 minutes)
pub fn engagement_score(click_count: u32, scroll_depth: f64, time_on_page: f64) -> f64 {
    let dwell_secs = (time_on_page / 1000.0).clamp(0.0, 300.0);
    let score = click_count as f64 * 2.0 + scroll_depth.max(0.0) * 0.5 + dwell_secs / 300.0 * 30.0;
    score.clamp(0.0, 100.0)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::vitals::Metric;

    pub fn metric(name: VitalName, value: f64, timestamp: i64) -> Metric {
        Metric {
            name,
            value,
            delta: value,
            id: format!("{}-{}", name, timestamp),
            timestamp,
            url: "https://journal.example/brews".to_string(),
            user_agent: "test-agent".to_string(),
            session_id: None,
            connection_type: None,
        }
    }

    pub fn report(timestamp: i64, values: &[(VitalName, f64)]) -> Report {
        let mut metrics: BTreeMap<VitalName, Option<Metric>> =
            VitalName::ALL.iter().map(|n| (*n, None)).collect();
        for (name, value) in values {
            metrics.insert(*name, Some(metric(*name, *value, timestamp)));
        }
        let budget_status = crate::budget::PerformanceBudget::default().evaluate(&metrics);
        Report {
            timestamp,
            url: "https://journal.example/brews".to_string(),
            session_id: format!("session-{}", timestamp),
            page_load_id: format!("load-{}", timestamp),
            metrics,
            custom_metrics: CustomMetrics::default(),
            device_info: DeviceInfo::default(),
            user_interactions: None,
            budget_status,
            navigation_timing: None,
        }
    }

    /// Report whose performance score is exactly `score` (multiple of 10 in 0..=100)
    pub fn report_with_score(timestamp: i64, score: u32) -> Report {
        // five vitals: good=100, needs-improvement=50, poor=0
        let halves = score / 10;
        let good = halves.saturating_sub(5).min(5);
        let needs = halves - 2 * good;
        let mut values = Vec::new();
        for (i, name) in VitalName::ALL.iter().enumerate() {
            let t = name.thresholds();
            let value = if (i as u32) < good {
                t.good
            } else if (i as u32) < good + needs {
                t.poor
            } else {
                t.poor * 2.0
            };
            values.push((*name, value));
        }
        report(timestamp, &values)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_performance_score_averages_rating_points() {
        let r = report(
            1,
            &[(VitalName::Lcp, 1000.0), (VitalName::Inp, 300.0), (VitalName::Cls, 0.5)],
        );
        assert_eq!(r.performance_score(), 50.0);
        assert_eq!(report(2, &[]).performance_score(), 0.0);
    }

    #[test]
    fn test_report_with_score_fixture() {
        for score in [0, 10, 50, 60, 90, 100] {
            assert_eq!(report_with_score(1, score).performance_score(), score as f64);
        }
    }

    #[test]
    fn test_path_extraction() {
        let mut r = report(1, &[]);
        r.url = "https://journal.example/tastings/42?tab=notes".to_string();
        assert_eq!(r.path(), "/tastings/42");
        r.url = "/admin?x=1".to_string();
        assert_eq!(r.path(), "/admin");
    }

    #[test]
    fn test_engagement_score_is_bounded() {
        assert_eq!(engagement_score(0, 0.0, 0.0), 0.0);
        assert_eq!(engagement_score(5, 60.0, 150_000.0), 10.0 + 30.0 + 15.0);
        assert_eq!(engagement_score(100, 100.0, 900_000.0), 100.0);
    }

    #[test]
    fn test_device_heuristics() {
        assert!(DeviceInfo::classify_mobile("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)"));
        assert!(!DeviceInfo::classify_mobile("Mozilla/5.0 (X11; Linux x86_64)"));
        assert!(DeviceInfo::classify_low_end(Some(2.0), Some(8)));
        assert!(DeviceInfo::classify_low_end(None, Some(2)));
        assert!(!DeviceInfo::classify_low_end(None, None));
    }
}
