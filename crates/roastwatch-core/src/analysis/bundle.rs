use super::trend::TrendDirection;
use super::{Priority, Recommendation, round1, sort_by_priority};
use crate::bundle::BundleSnapshot;
use serde::{Deserialize, Serialize};

const LARGE_BUNDLE_KB: f64 = 2000.0;
const MEDIUM_BUNDLE_KB: f64 = 1000.0;
const HIGH_MEMORY_PERCENT: f64 = 80.0;
const ELEVATED_MEMORY_PERCENT: f64 = 60.0;
const LOW_GZIP_SAVINGS_PERCENT: f64 = 30.0;
const COMPRESSIBLE_FLOOR_BYTES: u64 = 100 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BundleRating {
    Excellent,
    Good,
    NeedsImprovement,
    Poor,
}

impl BundleRating {
    pub fn from_score(score: u32) -> Self {
        if score >= 90 {
            BundleRating::Excellent
        } else if score >= 75 {
            BundleRating::Good
        } else if score >= 50 {
            BundleRating::NeedsImprovement
        } else {
            BundleRating::Poor
        }
    }
}

/// Change relative to the preceding snapshot (zero when there is none)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleDeltas {
    pub total_size: i64,
    pub javascript_size: i64,
    pub memory_percent: f64,
    pub resource_count: i64,
    pub page_load: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleAnalysis {
    pub score: u32,
    pub rating: BundleRating,
    pub issues: Vec<String>,
    pub recommendations: Vec<Recommendation>,
    pub deltas: BundleDeltas,
}

/// Score a snapshot and compare it with the one before it
pub fn analyze_bundle(current: &BundleSnapshot, previous: Option<&BundleSnapshot>) -> BundleAnalysis {
    let total_kb = current.bundle_size.total_kb();
    let memory_percent = current.memory_usage.usage_percent;

    let mut score: i32 = 100;
    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    if total_kb > LARGE_BUNDLE_KB {
        score -= 20;
        issues.push(format!("Total bundle size {:.0}KB exceeds {:.0}KB", total_kb, LARGE_BUNDLE_KB));
        recommendations.push(Recommendation::new(
            Priority::High,
            "bundle",
            "Reduce bundle size",
            "Split code by route, lazy-load non-critical modules and remove unused dependencies",
        ));
    } else if total_kb > MEDIUM_BUNDLE_KB {
        score -= 10;
        issues.push(format!("Total bundle size {:.0}KB exceeds {:.0}KB", total_kb, MEDIUM_BUNDLE_KB));
        recommendations.push(Recommendation::new(
            Priority::Medium,
            "bundle",
            "Trim bundle size",
            "Audit large dependencies and defer scripts that are not needed for first render",
        ));
    }

    if memory_percent > HIGH_MEMORY_PERCENT {
        score -= 25;
        issues.push(format!("Heap usage at {:.1}% of limit", memory_percent));
        recommendations.push(Recommendation::new(
            Priority::High,
            "memory",
            "Reduce memory pressure",
            "Look for leaked listeners and detached DOM nodes; release large caches",
        ));
    } else if memory_percent > ELEVATED_MEMORY_PERCENT {
        score -= 10;
        issues.push(format!("Heap usage at {:.1}% of limit", memory_percent));
        recommendations.push(Recommendation::new(
            Priority::Medium,
            "memory",
            "Watch memory growth",
            "Profile heap snapshots across navigations to confirm usage is stable",
        ));
    }

    let compression = &current.compression_stats;
    if compression.compressible_bytes > COMPRESSIBLE_FLOOR_BYTES
        && compression.gzip_savings < LOW_GZIP_SAVINGS_PERCENT
    {
        issues.push(format!(
            "Text resources compressed by only {:.1}%",
            compression.gzip_savings
        ));
        recommendations.push(Recommendation::new(
            Priority::Medium,
            "compression",
            "Enable text compression",
            "Serve scripts and stylesheets with gzip or brotli content encoding",
        ));
    }

    let size = &current.bundle_size;
    if size.total > 0 && size.images * 2 > size.total {
        recommendations.push(Recommendation::new(
            Priority::Low,
            "images",
            "Optimize images",
            "Images account for most transferred bytes; use modern formats and responsive sizes",
        ));
    }

    sort_by_priority(&mut recommendations);

    let score = score.max(0) as u32;
    BundleAnalysis {
        score,
        rating: BundleRating::from_score(score),
        issues,
        recommendations,
        deltas: previous.map(|p| deltas(current, p)).unwrap_or_default(),
    }
}

fn deltas(current: &BundleSnapshot, previous: &BundleSnapshot) -> BundleDeltas {
    BundleDeltas {
        total_size: current.bundle_size.total as i64 - previous.bundle_size.total as i64,
        javascript_size: current.bundle_size.javascript as i64
            - previous.bundle_size.javascript as i64,
        memory_percent: current.memory_usage.usage_percent - previous.memory_usage.usage_percent,
        resource_count: current.resource_count.total as i64 - previous.resource_count.total as i64,
        page_load: current.execution_timing.page_load - previous.execution_timing.page_load,
    }
}

/// Direction of resource weight over a monitor history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleTrend {
    pub snapshots: usize,
    pub size_change_percent: f64,
    pub memory_change: f64,
    pub trend: TrendDirection,
}

/// Compare the first and last snapshot of an oldest-first history
pub fn bundle_trend(history: &[BundleSnapshot]) -> Option<BundleTrend> {
    let (first, last) = match history {
        [first, .., last] => (first, last),
        _ => return None,
    };

    let size_change_percent = if first.bundle_size.total == 0 {
        0.0
    } else {
        (last.bundle_size.total as f64 - first.bundle_size.total as f64)
            / first.bundle_size.total as f64
            * 100.0
    };

    // growing bundles are a decline
    let trend = if size_change_percent.abs() < 5.0 {
        TrendDirection::Stable
    } else if size_change_percent > 0.0 {
        TrendDirection::Declining
    } else {
        TrendDirection::Improving
    };

    Some(BundleTrend {
        snapshots: history.len(),
        size_change_percent: round1(size_change_percent),
        memory_change: round1(last.memory_usage.usage_percent - first.memory_usage.usage_percent),
        trend,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{BundleSize, MemoryUsage};

    fn snapshot(total: u64, memory_percent: f64) -> BundleSnapshot {
        BundleSnapshot {
            bundle_size: BundleSize {
                javascript: total,
                total,
                ..Default::default()
            },
            memory_usage: MemoryUsage {
                usage_percent: memory_percent,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_large_bundle_scores_good() {
        let analysis = analyze_bundle(&snapshot(2_500_000, 0.0), None);
        assert_eq!(analysis.score, 80);
        assert_eq!(analysis.rating, BundleRating::Good);
        assert_eq!(analysis.issues.len(), 1);
        assert_eq!(analysis.deltas, BundleDeltas::default());
    }

    #[test]
    fn test_penalties_stack_and_floor() {
        let analysis = analyze_bundle(&snapshot(1_100_000, 85.0), None);
        assert_eq!(analysis.score, 65);
        assert_eq!(analysis.rating, BundleRating::NeedsImprovement);
        assert_eq!(analysis.recommendations[0].priority, Priority::High);

        let moderate = analyze_bundle(&snapshot(500_000, 61.0), None);
        assert_eq!(moderate.score, 90);
        assert_eq!(moderate.rating, BundleRating::Excellent);
    }

    #[test]
    fn test_rating_cutoffs() {
        assert_eq!(BundleRating::from_score(100), BundleRating::Excellent);
        assert_eq!(BundleRating::from_score(89), BundleRating::Good);
        assert_eq!(BundleRating::from_score(75), BundleRating::Good);
        assert_eq!(BundleRating::from_score(50), BundleRating::NeedsImprovement);
        assert_eq!(BundleRating::from_score(49), BundleRating::Poor);
        assert_eq!(BundleRating::from_score(0), BundleRating::Poor);
    }

    #[test]
    fn test_deltas_against_previous() {
        let previous = snapshot(1_000, 10.0);
        let analysis = analyze_bundle(&snapshot(1_500, 12.5), Some(&previous));
        assert_eq!(analysis.deltas.total_size, 500);
        assert_eq!(analysis.deltas.javascript_size, 500);
        assert_eq!(analysis.deltas.memory_percent, 2.5);
    }

    #[test]
    fn test_bundle_trend() {
        assert_eq!(bundle_trend(&[snapshot(100, 0.0)]), None);

        let trend = bundle_trend(&[snapshot(1000, 20.0), snapshot(1020, 25.0), snapshot(1200, 30.0)]).unwrap();
        assert_eq!(trend.snapshots, 3);
        assert_eq!(trend.size_change_percent, 20.0);
        assert_eq!(trend.memory_change, 10.0);
        assert_eq!(trend.trend, TrendDirection::Declining);
    }
}
