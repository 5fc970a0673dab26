use super::{Analyzer, percent, round1};
use crate::report::Report;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const TOP_PLATFORMS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInsights {
    pub devices_analyzed: usize,
    pub low_end_percent: f64,
    pub mobile_percent: f64,
    /// Share of page views per connection type, in percent
    pub connection_types: BTreeMap<String, f64>,
    pub top_platforms: Vec<PlatformShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformShare {
    pub platform: String,
    pub count: usize,
}

pub struct DeviceAnalyzer;

impl Analyzer for DeviceAnalyzer {
    type Output = DeviceInsights;

    fn analyze(&self, reports: &[Report]) -> DeviceInsights {
        let total = reports.len();
        if total == 0 {
            return DeviceInsights::default();
        }

        let low_end = reports.iter().filter(|r| r.device_info.is_low_end_device).count();
        let mobile = reports.iter().filter(|r| r.device_info.is_mobile).count();

        let mut connections: HashMap<&str, usize> = HashMap::new();
        let mut platforms: HashMap<&str, usize> = HashMap::new();
        for report in reports {
            let connection = match report.device_info.connection_type.as_str() {
                "" => "unknown",
                other => other,
            };
            *connections.entry(connection).or_default() += 1;
            *platforms.entry(report.device_info.platform.as_str()).or_default() += 1;
        }

        let connection_types = connections
            .into_iter()
            .map(|(kind, count)| (kind.to_string(), round1(percent(count, total))))
            .collect();

        let mut top_platforms: Vec<PlatformShare> = platforms
            .into_iter()
            .map(|(platform, count)| PlatformShare {
                platform: platform.to_string(),
                count,
            })
            .collect();
        top_platforms.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.platform.cmp(&b.platform)));
        top_platforms.truncate(TOP_PLATFORMS);

        DeviceInsights {
            devices_analyzed: total,
            low_end_percent: round1(percent(low_end, total)),
            mobile_percent: round1(percent(mobile, total)),
            connection_types,
            top_platforms,
        }
    }
}
