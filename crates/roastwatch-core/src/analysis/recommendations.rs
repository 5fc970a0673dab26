use super::behavior::UserBehavior;
use super::bottlenecks::Bottlenecks;
use super::devices::DeviceInsights;
use super::trend::{TrendDirection, TrendSummary};
use super::{Priority, Recommendation, sort_by_priority};
use crate::vitals::VitalName;

const HIGH_BOUNCE_RATE: f64 = 50.0;
const LOW_ENGAGEMENT: f64 = 30.0;
const HIGH_LOW_END_SHARE: f64 = 30.0;
const HIGH_MOBILE_SHARE: f64 = 60.0;

/// Rule-based advice over the individual analyses, highest priority first
pub fn recommend(
    trend: &TrendSummary,
    behavior: &UserBehavior,
    devices: &DeviceInsights,
    bottlenecks: &Bottlenecks,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if trend.trend == TrendDirection::Declining {
        recommendations.push(Recommendation::new(
            Priority::High,
            "performance",
            "Performance is declining",
            format!(
                "Recent page views score {:.1} points lower than the previous period; review recent deployments",
                trend.change.abs()
            ),
        ));
    }

    if behavior.sessions_analyzed > 0 {
        if behavior.bounce_rate > HIGH_BOUNCE_RATE {
            recommendations.push(Recommendation::new(
                Priority::High,
                "engagement",
                "High bounce rate",
                format!(
                    "{:.1}% of sessions end within 5 seconds; prioritize above-the-fold content",
                    behavior.bounce_rate
                ),
            ));
        }
        if behavior.avg_engagement < LOW_ENGAGEMENT {
            recommendations.push(Recommendation::new(
                Priority::Medium,
                "engagement",
                "Low engagement",
                format!(
                    "Average engagement score is {:.1}; check that interactive elements respond quickly",
                    behavior.avg_engagement
                ),
            ));
        }
    }

    if devices.devices_analyzed > 0 {
        if devices.low_end_percent > HIGH_LOW_END_SHARE {
            recommendations.push(Recommendation::new(
                Priority::Medium,
                "devices",
                "Optimize for low-end devices",
                format!(
                    "{:.1}% of visits come from low-end devices; reduce JavaScript execution and memory use",
                    devices.low_end_percent
                ),
            ));
        }
        if devices.mobile_percent > HIGH_MOBILE_SHARE {
            recommendations.push(Recommendation::new(
                Priority::Medium,
                "devices",
                "Prioritize mobile performance",
                format!(
                    "{:.1}% of visits are on mobile; test on throttled networks and small viewports",
                    devices.mobile_percent
                ),
            ));
        }
    }

    if let Some(worst) = bottlenecks.worst_metric() {
        let thresholds = worst.metric.thresholds();
        let priority = if worst.average > thresholds.poor {
            Some(Priority::High)
        } else if worst.average > thresholds.good {
            Some(Priority::Medium)
        } else {
            None
        };
        if let Some(priority) = priority {
            recommendations.push(Recommendation::new(
                priority,
                "vitals",
                format!("Improve {}", worst.metric),
                format!(
                    "Average {} is {:.2}; {}",
                    worst.metric,
                    worst.average,
                    metric_advice(worst.metric)
                ),
            ));
        }
    }

    if recommendations.is_empty() {
        recommendations.push(Recommendation::new(
            Priority::Low,
            "monitoring",
            "Keep monitoring",
            "No issues detected; continue collecting data to catch regressions early",
        ));
    }

    sort_by_priority(&mut recommendations);
    recommendations
}

fn metric_advice(metric: VitalName) -> &'static str {
    match metric {
        VitalName::Lcp => "preload the hero image and cut render-blocking resources",
        VitalName::Inp => "break up long tasks and defer non-essential event handler work",
        VitalName::Cls => "reserve space for images and late-loading content",
        VitalName::Fcp => "inline critical CSS and shorten the critical request chain",
        VitalName::Ttfb => "cache responses closer to users and speed up server rendering",
    }
}
