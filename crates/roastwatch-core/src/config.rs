use crate::budget::PerformanceBudget;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_DEBOUNCE_MS: u64 = 5_000;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_RESAMPLE_INTERVAL_MS: u64 = 30_000;
pub const DEFAULT_BUNDLE_HISTORY_CAPACITY: usize = 100;
pub const DEFAULT_CACHE_CAPACITY: usize = 10;
pub const DEFAULT_CACHE_KEY_PREFIX: &str = "perf_";
/// Upper bound for every configured delay: one day
pub const MAX_DELAY_MS: u64 = 86_400_000;

/// Tunables for collection, retention and budgets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Quiet period before buffered vitals are flushed into a report
    pub debounce_ms: u64,
    /// Delay after the load event before the first resource sample
    pub settle_delay_ms: u64,
    /// Interval between resource samples; `None` samples once
    pub resample_interval_ms: Option<u64>,
    pub bundle_history_capacity: usize,
    pub cache_capacity: usize,
    pub cache_key_prefix: String,
    pub budget: PerformanceBudget,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            resample_interval_ms: Some(DEFAULT_RESAMPLE_INTERVAL_MS),
            bundle_history_capacity: DEFAULT_BUNDLE_HISTORY_CAPACITY,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_key_prefix: DEFAULT_CACHE_KEY_PREFIX.to_string(),
            budget: PerformanceBudget::default(),
        }
    }
}

impl TelemetryConfig {
    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Reading telemetry config from: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: TelemetryConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.debounce_ms == 0 {
            return Err(Error::Config("debounce_ms must be positive".to_string()));
        }
        if self.bundle_history_capacity == 0 || self.cache_capacity == 0 {
            return Err(Error::Config("capacities must be positive".to_string()));
        }
        if self.cache_key_prefix.is_empty() {
            return Err(Error::Config("cache_key_prefix must not be empty".to_string()));
        }
        if self.resample_interval_ms == Some(0) {
            return Err(Error::Config(
                "resample_interval_ms must be positive when set".to_string(),
            ));
        }
        let delays = [
            ("debounce_ms", Some(self.debounce_ms)),
            ("settle_delay_ms", Some(self.settle_delay_ms)),
            ("resample_interval_ms", self.resample_interval_ms),
        ];
        for (name, value) in delays {
            if value.is_some_and(|ms| ms > MAX_DELAY_MS) {
                return Err(Error::Config(format!(
                    "{} must not exceed {} ms",
                    name, MAX_DELAY_MS
                )));
            }
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn resample_interval(&self) -> Option<Duration> {
        self.resample_interval_ms.map(Duration::from_millis)
    }
}
