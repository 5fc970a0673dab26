use super::{Analyzer, mean, round1};
use crate::report::Report;
use serde::{Deserialize, Serialize};

pub const TREND_WINDOW: usize = 5;
/// Changes smaller than this many score points are reported as stable
pub const STABLE_BAND: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub score: f64,
    pub trend: TrendDirection,
    pub change: f64,
}

impl TrendSummary {
    fn stable(score: f64) -> Self {
        Self {
            score: round1(score),
            trend: TrendDirection::Stable,
            change: 0.0,
        }
    }
}

/// Compares the mean score of the most recent window against the window before it
pub struct TrendAnalyzer {
    window: usize,
}

impl TrendAnalyzer {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new(TREND_WINDOW)
    }
}

impl Analyzer for TrendAnalyzer {
    type Output = TrendSummary;

    fn analyze(&self, reports: &[Report]) -> TrendSummary {
        let scores: Vec<f64> = reports.iter().map(Report::performance_score).collect();

        if scores.len() < 2 {
            return TrendSummary::stable(mean(&scores));
        }

        let recent = &scores[..self.window.min(scores.len())];
        let older: Vec<f64> = scores.iter().skip(self.window).take(self.window).copied().collect();

        if older.is_empty() {
            return TrendSummary::stable(mean(&scores));
        }

        let recent_mean = mean(recent);
        let change = recent_mean - mean(&older);

        let trend = if change.abs() < STABLE_BAND {
            TrendDirection::Stable
        } else if change > 0.0 {
            TrendDirection::Improving
        } else {
            TrendDirection::Declining
        };

        tracing::debug!(
            "Trend: recent={:.1} change={:.1} ({:?})",
            recent_mean,
            change,
            trend
        );

        TrendSummary {
            score: round1(recent_mean),
            trend,
            change: round1(change),
        }
    }
}
