use super::{Analyzer, mean, percent, round1};
use crate::report::Report;
use serde::{Deserialize, Serialize};

/// Sessions shorter than this are counted as bounces
pub const BOUNCE_THRESHOLD_MS: f64 = 5_000.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBehavior {
    pub sessions_analyzed: usize,
    pub avg_session_duration: f64,
    pub avg_engagement: f64,
    pub avg_clicks: f64,
    pub avg_scroll_depth: f64,
    pub bounce_rate: f64,
    pub patterns: Vec<String>,
}

pub struct BehaviorAnalyzer;

impl Analyzer for BehaviorAnalyzer {
    type Output = UserBehavior;

    fn analyze(&self, reports: &[Report]) -> UserBehavior {
        let sessions: Vec<_> = reports
            .iter()
            .filter_map(|r| r.user_interactions.as_ref())
            .collect();

        if sessions.is_empty() {
            return UserBehavior::default();
        }

        let durations: Vec<f64> = sessions.iter().map(|s| s.time_on_page).collect();
        let engagement: Vec<f64> = sessions.iter().map(|s| s.engagement_score).collect();
        let clicks: Vec<f64> = sessions.iter().map(|s| s.click_count as f64).collect();
        let scroll: Vec<f64> = sessions.iter().map(|s| s.scroll_depth).collect();
        let bounces = durations.iter().filter(|d| **d < BOUNCE_THRESHOLD_MS).count();

        let avg_session_duration = mean(&durations);
        let avg_clicks = mean(&clicks);
        let avg_scroll_depth = mean(&scroll);
        let bounce_rate = percent(bounces, sessions.len());

        let mut patterns = Vec::new();
        if avg_clicks > 10.0 {
            patterns.push("High interaction rate".to_string());
        }
        if avg_scroll_depth > 80.0 {
            patterns.push("Users read content thoroughly".to_string());
        }
        if avg_session_duration > 120_000.0 {
            patterns.push("Long session durations".to_string());
        }
        if bounce_rate < 20.0 {
            patterns.push("Low bounce rate".to_string());
        }

        UserBehavior {
            sessions_analyzed: sessions.len(),
            avg_session_duration: round1(avg_session_duration),
            avg_engagement: round1(mean(&engagement)),
            avg_clicks: round1(avg_clicks),
            avg_scroll_depth: round1(avg_scroll_depth),
            bounce_rate: round1(bounce_rate),
            patterns,
        }
    }
}
