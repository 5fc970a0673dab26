use crate::environment::{DeviceHints, HostEnvironment, InteractionCounters};
use crate::{Error, Result};
use chrono::DateTime;
use roastwatch_core::timing::{MemoryInfo, NavigationTiming, ResourceEntry};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// The subset of a HAR capture needed to replay a page load
#[derive(Debug, Clone, Deserialize)]
pub struct Har {
    pub log: HarLog,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HarLog {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub pages: Vec<HarPage>,
    pub entries: Vec<HarEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarPage {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub page_timings: HarPageTimings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarPageTimings {
    pub on_content_load: Option<f64>,
    pub on_load: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarEntry {
    pub started_date_time: String,
    #[serde(default)]
    pub time: f64,
    pub request: HarRequest,
    pub response: HarResponse,
    #[serde(default)]
    pub timings: HarTimings,
    #[serde(rename = "_resourceType")]
    pub resource_type: Option<String>,
    #[serde(rename = "_transferSize")]
    pub transfer_size: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HarRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<HarHeader>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarResponse {
    pub status: i64,
    pub content: HarContent,
    #[serde(default)]
    pub headers_size: i64,
    #[serde(default)]
    pub body_size: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarContent {
    pub size: i64,
    #[serde(default)]
    pub mime_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HarHeader {
    pub name: String,
    pub value: String,
}

/// Phase durations in milliseconds; -1 means not applicable
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarTimings {
    #[serde(default)]
    pub blocked: Option<f64>,
    #[serde(default)]
    pub dns: Option<f64>,
    #[serde(default)]
    pub connect: Option<f64>,
    #[serde(default)]
    pub send: f64,
    #[serde(default)]
    pub wait: f64,
    #[serde(default)]
    pub receive: f64,
}

fn phase(value: Option<f64>) -> f64 {
    value.filter(|v| *v > 0.0).unwrap_or(0.0)
}

impl HarEntry {
    fn initiator_type(&self) -> &str {
        match self.resource_type.as_deref() {
            Some("xhr") => "xmlhttprequest",
            Some("fetch") => "fetch",
            Some("script") => "script",
            Some("stylesheet") => "link",
            Some("image") => "img",
            Some("font") => "css",
            Some("document") => "navigation",
            _ if self.response.content.mime_type.contains("json") => "fetch",
            _ => "other",
        }
    }

    fn transferred(&self) -> u64 {
        match self.transfer_size {
            Some(size) if size >= 0 => size as u64,
            _ => (self.response.headers_size.max(0) + self.response.body_size.max(0)) as u64,
        }
    }

    fn started_ms(&self) -> Option<i64> {
        DateTime::parse_from_rfc3339(&self.started_date_time)
            .ok()
            .map(|t| t.timestamp_millis())
    }
}

/// A recorded page load served through the [`HostEnvironment`] interface
#[derive(Debug, Clone)]
pub struct HarEnvironment {
    har: Har,
}

impl HarEnvironment {
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Reading HAR capture from: {}", path.display());

        let file = File::open(path)?;
        let har: Har = serde_json::from_reader(BufReader::new(file))?;
        Self::new(har)
    }

    pub fn from_str(content: &str) -> Result<Self> {
        let har: Har = serde_json::from_str(content)?;
        Self::new(har)
    }

    pub fn new(har: Har) -> Result<Self> {
        for (idx, entry) in har.log.entries.iter().enumerate() {
            if entry.request.url.is_empty() {
                return Err(Error::InvalidHar(format!("Entry {} has empty request URL", idx)));
            }
        }
        if har.log.entries.is_empty() {
            tracing::warn!("HAR capture contains no entries");
        }

        tracing::info!("Loaded HAR capture with {} entries", har.log.entries.len());
        Ok(Self { har })
    }

    pub fn har(&self) -> &Har {
        &self.har
    }

    fn document(&self) -> Option<&HarEntry> {
        self.har
            .log
            .entries
            .iter()
            .find(|e| e.resource_type.as_deref() == Some("document"))
            .or_else(|| self.har.log.entries.first())
    }

    fn origin_ms(&self) -> Option<i64> {
        self.har.log.entries.iter().filter_map(HarEntry::started_ms).min()
    }
}

impl HostEnvironment for HarEnvironment {
    fn url(&self) -> String {
        self.document()
            .map(|e| e.request.url.clone())
            .unwrap_or_default()
    }

    fn user_agent(&self) -> String {
        self.document()
            .and_then(|e| {
                e.request
                    .headers
                    .iter()
                    .find(|h| h.name.eq_ignore_ascii_case("user-agent"))
            })
            .map(|h| h.value.clone())
            .unwrap_or_default()
    }

    /// Approximated from the document entry's phases and the page timings
    fn navigation_timing(&self) -> Option<NavigationTiming> {
        let doc = self.document()?;
        let t = &doc.timings;

        let domain_lookup_start = phase(t.blocked);
        let domain_lookup_end = domain_lookup_start + phase(t.dns);
        let connect_end = domain_lookup_end + phase(t.connect);
        let request_start = connect_end + t.send.max(0.0);
        let response_start = request_start + t.wait.max(0.0);
        let response_end = response_start + t.receive.max(0.0);

        let timings = self
            .har
            .log
            .pages
            .first()
            .map(|p| p.page_timings.clone())
            .unwrap_or_default();
        let content_loaded = timings.on_content_load.unwrap_or(response_end).max(response_end);
        let load = timings.on_load.unwrap_or(content_loaded).max(content_loaded);

        Some(NavigationTiming {
            start_time: 0.0,
            domain_lookup_start,
            domain_lookup_end,
            connect_start: domain_lookup_end,
            connect_end,
            request_start,
            response_start,
            response_end,
            dom_interactive: content_loaded,
            dom_content_loaded_event_start: content_loaded,
            dom_content_loaded_event_end: content_loaded,
            load_event_start: load,
            load_event_end: load,
            navigation_type: Some("navigate".to_string()),
        })
    }

    fn resource_entries(&self) -> Vec<ResourceEntry> {
        let origin = self.origin_ms();
        self.har
            .log
            .entries
            .iter()
            .filter(|e| e.resource_type.as_deref() != Some("document"))
            .map(|e| {
                let decoded = e.response.content.size.max(0) as u64;
                let mut entry = ResourceEntry::new(e.request.url.clone(), e.initiator_type())
                    .with_sizes(e.transferred(), decoded);
                entry.start_time = match (origin, e.started_ms()) {
                    (Some(origin), Some(started)) => (started - origin) as f64,
                    _ => 0.0,
                };
                entry.duration = e.time.max(0.0);
                entry
            })
            .collect()
    }

    fn memory(&self) -> Option<MemoryInfo> {
        None
    }

    fn device_hints(&self) -> DeviceHints {
        DeviceHints::default()
    }

    fn interactions(&self) -> Option<InteractionCounters> {
        None
    }

    fn is_loaded(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPTURE: &str = r#"{
        "log": {
            "version": "1.2",
            "pages": [{"title": "Journal", "pageTimings": {"onContentLoad": 800, "onLoad": 1500}}],
            "entries": [
                {
                    "startedDateTime": "2024-01-01T10:00:00.000Z",
                    "time": 300,
                    "_resourceType": "document",
                    "request": {"method": "GET", "url": "https://journal.example/brews",
                        "headers": [{"name": "User-Agent", "value": "Mozilla/5.0 (Android 14; Mobile)"}]},
                    "response": {"status": 200, "content": {"size": 20000, "mimeType": "text/html"},
                        "headersSize": 300, "bodySize": 5000},
                    "timings": {"blocked": 5, "dns": 20, "connect": 40, "send": 1, "wait": 180, "receive": 54}
                },
                {
                    "startedDateTime": "2024-01-01T10:00:00.350Z",
                    "time": 120,
                    "_resourceType": "script",
                    "_transferSize": 90000,
                    "request": {"method": "GET", "url": "https://cdn.example/app.js"},
                    "response": {"status": 200, "content": {"size": 300000, "mimeType": "application/javascript"}},
                    "timings": {"send": 0, "wait": 60, "receive": 60}
                },
                {
                    "startedDateTime": "2024-01-01T10:00:00.900Z",
                    "time": 40,
                    "request": {"method": "GET", "url": "https://api.example/brews?limit=10"},
                    "response": {"status": 200, "content": {"size": 4000, "mimeType": "application/json"},
                        "headersSize": 200, "bodySize": 1000},
                    "timings": {"blocked": -1, "dns": -1, "connect": -1, "send": 0, "wait": 30, "receive": 10}
                }
            ]
        }
    }"#;

    #[test]
    fn test_document_drives_page_signals() {
        let env = HarEnvironment::from_str(CAPTURE).unwrap();
        assert_eq!(env.url(), "https://journal.example/brews");
        assert!(env.device_info().is_mobile);
        assert!(env.is_loaded());
    }

    #[test]
    fn test_navigation_timing_from_phases() {
        let env = HarEnvironment::from_str(CAPTURE).unwrap();
        let nav = env.navigation_timing().unwrap();

        assert_eq!(nav.domain_lookup_start, 5.0);
        assert_eq!(nav.domain_lookup_end, 25.0);
        assert_eq!(nav.connect_end, 65.0);
        assert_eq!(nav.response_start, 246.0);
        assert_eq!(nav.response_end, 300.0);
        assert_eq!(nav.load_event_end, 1_500.0);

        let derived = nav.derived();
        assert_eq!(derived.dns_lookup, 20.0);
        assert_eq!(derived.server_response, 180.0);
    }

    #[test]
    fn test_resources_exclude_document() {
        let env = HarEnvironment::from_str(CAPTURE).unwrap();
        let resources = env.resource_entries();

        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].transfer_size, 90_000);
        assert_eq!(resources[0].decoded_body_size, 300_000);
        assert_eq!(resources[0].start_time, 350.0);
        assert_eq!(resources[1].transfer_size, 1_200);
        assert!(resources[1].is_fetch());
    }

    #[test]
    fn test_rejects_entry_without_url() {
        let content = r#"{"log": {"entries": [{
            "startedDateTime": "2024-01-01T10:00:00Z",
            "request": {"method": "GET", "url": ""},
            "response": {"status": 200, "content": {"size": 0}}
        }]}}"#;
        assert!(matches!(
            HarEnvironment::from_str(content),
            Err(Error::InvalidHar(_))
        ));
    }
}
