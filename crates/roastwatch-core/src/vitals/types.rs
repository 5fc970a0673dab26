use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::normalize::rate;

/// The five vitals the engine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VitalName {
    Lcp,
    Inp,
    Cls,
    Fcp,
    Ttfb,
}

impl VitalName {
    pub const ALL: [VitalName; 5] = [
        VitalName::Lcp,
        VitalName::Inp,
        VitalName::Cls,
        VitalName::Fcp,
        VitalName::Ttfb,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VitalName::Lcp => "LCP",
            VitalName::Inp => "INP",
            VitalName::Cls => "CLS",
            VitalName::Fcp => "FCP",
            VitalName::Ttfb => "TTFB",
        }
    }

    /// Unit used when forwarding the value as a measurement
    pub fn unit(&self) -> &'static str {
        match self {
            VitalName::Cls => "",
            _ => "millisecond",
        }
    }
}

impl fmt::Display for VitalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VitalName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "LCP" => Ok(VitalName::Lcp),
            "INP" => Ok(VitalName::Inp),
            "CLS" => Ok(VitalName::Cls),
            "FCP" => Ok(VitalName::Fcp),
            "TTFB" => Ok(VitalName::Ttfb),
            _ => Err(Error::UnknownMetric(s.to_string())),
        }
    }
}

/// Three-level classification of a vital value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rating {
    Good,
    NeedsImprovement,
    Poor,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Good => "good",
            Rating::NeedsImprovement => "needs-improvement",
            Rating::Poor => "poor",
        }
    }

    /// Points contributed to a report's performance score
    pub fn points(&self) -> f64 {
        match self {
            Rating::Good => 100.0,
            Rating::NeedsImprovement => 50.0,
            Rating::Poor => 0.0,
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A measurement as delivered by the host's performance callbacks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVital {
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub delta: f64,
    #[serde(default)]
    pub id: String,
}

impl RawVital {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            delta: value,
            id: String::new(),
        }
    }
}

/// A normalized, rated vital.
///
/// The rating is derived from `(name, value)` on every access. It is written
/// out on serialization for consumers of exported data, and ignored when read
/// back in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "MetricRecord", into = "MetricRecord")]
pub struct Metric {
    pub name: VitalName,
    pub value: f64,
    pub delta: f64,
    pub id: String,
    pub timestamp: i64,
    pub url: String,
    pub user_agent: String,
    pub session_id: Option<String>,
    pub connection_type: Option<String>,
}

impl Metric {
    pub fn rating(&self) -> Rating {
        rate(self.name, self.value)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricRecord {
    name: VitalName,
    value: f64,
    #[serde(default, skip_deserializing)]
    rating: Option<Rating>,
    #[serde(default)]
    delta: f64,
    #[serde(default)]
    id: String,
    timestamp: i64,
    #[serde(default)]
    url: String,
    #[serde(default)]
    user_agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    connection_type: Option<String>,
}

impl From<MetricRecord> for Metric {
    fn from(record: MetricRecord) -> Self {
        Self {
            name: record.name,
            value: record.value,
            delta: record.delta,
            id: record.id,
            timestamp: record.timestamp,
            url: record.url,
            user_agent: record.user_agent,
            session_id: record.session_id,
            connection_type: record.connection_type,
        }
    }
}

impl From<Metric> for MetricRecord {
    fn from(metric: Metric) -> Self {
        Self {
            rating: Some(metric.rating()),
            name: metric.name,
            value: metric.value,
            delta: metric.delta,
            id: metric.id,
            timestamp: metric.timestamp,
            url: metric.url,
            user_agent: metric.user_agent,
            session_id: metric.session_id,
            connection_type: metric.connection_type,
        }
    }
}
