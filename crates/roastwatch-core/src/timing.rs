use serde::{Deserialize, Serialize};

/// Subset of a navigation-timing entry, in milliseconds relative to navigation start
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigationTiming {
    pub start_time: f64,
    pub domain_lookup_start: f64,
    pub domain_lookup_end: f64,
    pub connect_start: f64,
    pub connect_end: f64,
    pub request_start: f64,
    pub response_start: f64,
    pub response_end: f64,
    pub dom_interactive: f64,
    pub dom_content_loaded_event_start: f64,
    pub dom_content_loaded_event_end: f64,
    pub load_event_start: f64,
    pub load_event_end: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation_type: Option<String>,
}

impl NavigationTiming {
    /// Derived page timings, each clamped to zero
    pub fn derived(&self) -> CustomMetrics {
        CustomMetrics {
            dns_lookup: span(self.domain_lookup_start, self.domain_lookup_end),
            tcp_connect: span(self.connect_start, self.connect_end),
            server_response: span(self.request_start, self.response_start),
            content_download: span(self.response_start, self.response_end),
            dom_processing: span(self.response_end, self.dom_interactive),
            dom_content_loaded: span(
                self.dom_content_loaded_event_start,
                self.dom_content_loaded_event_end,
            ),
            load_complete: span(self.start_time, self.load_event_end),
        }
    }

    /// Whether the load event has finished
    pub fn is_complete(&self) -> bool {
        self.load_event_end > 0.0
    }
}

/// Clamped difference between two timestamps
pub fn span(start: f64, end: f64) -> f64 {
    (end - start).max(0.0)
}

/// Timings derived from the navigation entry when a report is built
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomMetrics {
    pub dns_lookup: f64,
    pub tcp_connect: f64,
    pub server_response: f64,
    pub content_download: f64,
    pub dom_processing: f64,
    pub dom_content_loaded: f64,
    pub load_complete: f64,
}

/// One resource-timing entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceEntry {
    pub name: String,
    pub initiator_type: String,
    pub transfer_size: u64,
    pub encoded_body_size: u64,
    pub decoded_body_size: u64,
    pub start_time: f64,
    pub duration: f64,
}

impl ResourceEntry {
    pub fn new(name: impl Into<String>, initiator_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initiator_type: initiator_type.into(),
            ..Default::default()
        }
    }

    pub fn with_sizes(mut self, transfer_size: u64, decoded_body_size: u64) -> Self {
        self.transfer_size = transfer_size;
        self.encoded_body_size = transfer_size;
        self.decoded_body_size = decoded_body_size;
        self
    }

    /// Whether the entry was started by a script-driven network fetch
    pub fn is_fetch(&self) -> bool {
        matches!(self.initiator_type.as_str(), "fetch" | "xmlhttprequest")
    }
}

/// Heap introspection values, when the runtime exposes them
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryInfo {
    pub used_js_heap_size: u64,
    pub total_js_heap_size: u64,
    pub js_heap_size_limit: u64,
}
