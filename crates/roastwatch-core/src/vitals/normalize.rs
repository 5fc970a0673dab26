use super::types::{Metric, Rating, RawVital, VitalName};
use crate::{Error, Result};

/// Two-tier rating boundaries for a vital (inclusive upper bounds)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub good: f64,
    pub poor: f64,
}

impl VitalName {
    pub fn thresholds(&self) -> Thresholds {
        match self {
            VitalName::Lcp => Thresholds {
                good: 2500.0,
                poor: 4000.0,
            },
            VitalName::Inp => Thresholds {
                good: 200.0,
                poor: 500.0,
            },
            VitalName::Cls => Thresholds {
                good: 0.1,
                poor: 0.25,
            },
            VitalName::Fcp => Thresholds {
                good: 1800.0,
                poor: 3000.0,
            },
            VitalName::Ttfb => Thresholds {
                good: 800.0,
                poor: 1800.0,
            },
        }
    }
}

/// Rate a value against the fixed threshold table
pub fn rate(name: VitalName, value: f64) -> Rating {
    let thresholds = name.thresholds();
    if value <= thresholds.good {
        Rating::Good
    } else if value <= thresholds.poor {
        Rating::NeedsImprovement
    } else {
        Rating::Poor
    }
}

/// Page-level context captured when a vital is normalized
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricContext {
    pub timestamp: i64,
    pub url: String,
    pub user_agent: String,
    pub session_id: Option<String>,
    pub connection_type: Option<String>,
}

/// Convert a raw callback payload into a canonical metric.
///
/// Names outside the five known vitals are rejected instead of being rated,
/// so an unclassified signal can never pass as "good".
pub fn normalize(raw: &RawVital, context: &MetricContext) -> Result<Metric> {
    let name: VitalName = raw.name.parse()?;

    if !raw.value.is_finite() || raw.value < 0.0 {
        return Err(Error::InvalidValue {
            name: raw.name.clone(),
            value: raw.value,
        });
    }

    Ok(Metric {
        name,
        value: raw.value,
        delta: raw.delta,
        id: raw.id.clone(),
        timestamp: context.timestamp,
        url: context.url.clone(),
        user_agent: context.user_agent.clone(),
        session_id: context.session_id.clone(),
        connection_type: context.connection_type.clone(),
    })
}
