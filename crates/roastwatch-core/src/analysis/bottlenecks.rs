use super::{Analyzer, mean, round1};
use crate::clock::to_datetime;
use crate::report::Report;
use crate::vitals::VitalName;
use chrono::Timelike;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAverage {
    pub metric: VitalName,
    pub average: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageBottleneck {
    pub path: String,
    pub views: usize,
    pub average_score: f64,
    pub violations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyScore {
    pub hour: u32,
    pub average_score: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bottlenecks {
    /// Highest average values first
    pub slowest_metrics: Vec<MetricAverage>,
    /// Paths with at least one budget violation, most violations first
    pub problem_pages: Vec<PageBottleneck>,
    /// One entry per hour of day (UTC), 0 through 23
    pub hourly_scores: Vec<HourlyScore>,
}

impl Bottlenecks {
    /// The measured vital furthest above its "good" threshold, relative to that threshold
    pub fn worst_metric(&self) -> Option<&MetricAverage> {
        self.slowest_metrics
            .iter()
            .max_by(|a, b| relative_load(a).total_cmp(&relative_load(b)))
    }
}

fn relative_load(average: &MetricAverage) -> f64 {
    average.average / average.metric.thresholds().good
}

pub struct BottleneckAnalyzer {
    top_n: usize,
}

impl BottleneckAnalyzer {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }
}

impl Default for BottleneckAnalyzer {
    fn default() -> Self {
        Self::new(5)
    }
}

impl Analyzer for BottleneckAnalyzer {
    type Output = Bottlenecks;

    fn analyze(&self, reports: &[Report]) -> Bottlenecks {
        tracing::debug!("Analyzing bottlenecks over {} reports", reports.len());

        Bottlenecks {
            slowest_metrics: self.slowest_metrics(reports),
            problem_pages: self.problem_pages(reports),
            hourly_scores: hourly_scores(reports),
        }
    }
}

impl BottleneckAnalyzer {
    fn slowest_metrics(&self, reports: &[Report]) -> Vec<MetricAverage> {
        let mut values: BTreeMap<VitalName, Vec<f64>> = BTreeMap::new();
        for metric in reports.iter().flat_map(|r| r.measured()) {
            values.entry(metric.name).or_default().push(metric.value);
        }

        let mut averages: Vec<MetricAverage> = values
            .into_iter()
            .map(|(metric, values)| MetricAverage {
                metric,
                average: mean(&values),
                samples: values.len(),
            })
            .collect();
        averages.sort_by(|a, b| b.average.total_cmp(&a.average));
        averages.truncate(self.top_n);
        averages
    }

    fn problem_pages(&self, reports: &[Report]) -> Vec<PageBottleneck> {
        let mut pages: HashMap<String, (Vec<f64>, usize)> = HashMap::new();
        for report in reports {
            let (scores, violations) = pages.entry(report.path()).or_default();
            scores.push(report.performance_score());
            *violations += report.budget_status.violations();
        }

        let mut problem_pages: Vec<PageBottleneck> = pages
            .into_iter()
            .filter(|(_, (_, violations))| *violations > 0)
            .map(|(path, (scores, violations))| PageBottleneck {
                path,
                views: scores.len(),
                average_score: round1(mean(&scores)),
                violations,
            })
            .collect();

        problem_pages.sort_by(|a, b| {
            b.violations
                .cmp(&a.violations)
                .then_with(|| a.average_score.total_cmp(&b.average_score))
                .then_with(|| a.path.cmp(&b.path))
        });
        problem_pages.truncate(self.top_n);
        problem_pages
    }
}

fn hourly_scores(reports: &[Report]) -> Vec<HourlyScore> {
    let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); 24];
    for report in reports {
        if let Some(dt) = to_datetime(report.timestamp) {
            buckets[dt.hour() as usize].push(report.performance_score());
        }
    }

    buckets
        .into_iter()
        .enumerate()
        .map(|(hour, scores)| HourlyScore {
            hour: hour as u32,
            average_score: round1(mean(&scores)),
            samples: scores.len(),
        })
        .collect()
}
