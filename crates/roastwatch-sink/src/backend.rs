use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub category: String,
    pub message: String,
    pub level: Level,
    pub data: BTreeMap<String, serde_json::Value>,
}

/// Client side of an external monitoring service.
///
/// Implementations may fail; [`crate::TelemetrySink`] contains those failures.
pub trait MonitoringBackend: Send {
    fn set_measurement(&mut self, measurement: Measurement) -> Result<()>;
    fn set_tag(&mut self, key: &str, value: &str) -> Result<()>;
    fn add_breadcrumb(&mut self, breadcrumb: Breadcrumb) -> Result<()>;
    fn capture_message(&mut self, message: &str, level: Level) -> Result<()>;
}

/// Everything a backend has been sent, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkEvent {
    Measurement(Measurement),
    Tag { key: String, value: String },
    Breadcrumb(Breadcrumb),
    Message { message: String, level: Level },
}

/// Records events in memory; clones share the same event log
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<(String, Level)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Message { message, level } => Some((message, level)),
                _ => None,
            })
            .collect()
    }

    pub fn tag(&self, key: &str) -> Option<String> {
        self.events().into_iter().rev().find_map(|e| match e {
            SinkEvent::Tag { key: k, value } if k == key => Some(value),
            _ => None,
        })
    }

    fn push(&self, event: SinkEvent) -> Result<()> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| crate::Error::Unavailable("event log poisoned".to_string()))?;
        events.push(event);
        Ok(())
    }
}

impl MonitoringBackend for MemoryBackend {
    fn set_measurement(&mut self, measurement: Measurement) -> Result<()> {
        self.push(SinkEvent::Measurement(measurement))
    }

    fn set_tag(&mut self, key: &str, value: &str) -> Result<()> {
        self.push(SinkEvent::Tag {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    fn add_breadcrumb(&mut self, breadcrumb: Breadcrumb) -> Result<()> {
        self.push(SinkEvent::Breadcrumb(breadcrumb))
    }

    fn capture_message(&mut self, message: &str, level: Level) -> Result<()> {
        self.push(SinkEvent::Message {
            message: message.to_string(),
            level,
        })
    }
}

/// Writes every event to the log under the `roastwatch::sink` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingBackend;

impl MonitoringBackend for TracingBackend {
    fn set_measurement(&mut self, measurement: Measurement) -> Result<()> {
        tracing::info!(
            target: "roastwatch::sink",
            "measurement {}={} {}",
            measurement.name,
            measurement.value,
            measurement.unit
        );
        Ok(())
    }

    fn set_tag(&mut self, key: &str, value: &str) -> Result<()> {
        tracing::debug!(target: "roastwatch::sink", "tag {}={}", key, value);
        Ok(())
    }

    fn add_breadcrumb(&mut self, breadcrumb: Breadcrumb) -> Result<()> {
        tracing::info!(
            target: "roastwatch::sink",
            "breadcrumb [{}] {}",
            breadcrumb.category,
            breadcrumb.message
        );
        Ok(())
    }

    fn capture_message(&mut self, message: &str, level: Level) -> Result<()> {
        match level {
            Level::Info => tracing::info!(target: "roastwatch::sink", "{}", message),
            Level::Warning => tracing::warn!(target: "roastwatch::sink", "{}", message),
            Level::Error => tracing::error!(target: "roastwatch::sink", "{}", message),
        }
        Ok(())
    }
}
