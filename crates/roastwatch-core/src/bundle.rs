use crate::timing::MemoryInfo;
use serde::{Deserialize, Serialize};

/// Point-in-time sample of resource loading, memory and execution timing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleSnapshot {
    pub timestamp: i64,
    pub bundle_size: BundleSize,
    pub memory_usage: MemoryUsage,
    pub execution_timing: ExecutionTiming,
    pub resource_count: ResourceCount,
    pub compression_stats: CompressionStats,
}

/// Bytes loaded per resource category
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleSize {
    pub javascript: u64,
    pub css: u64,
    pub images: u64,
    pub fonts: u64,
    pub other: u64,
    pub total: u64,
}

impl BundleSize {
    pub fn total_kb(&self) -> f64 {
        self.total as f64 / 1024.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub used_js_heap_size: u64,
    pub total_js_heap_size: u64,
    pub js_heap_size_limit: u64,
    /// Used heap as a percentage of the heap limit
    pub usage_percent: f64,
}

impl From<Option<MemoryInfo>> for MemoryUsage {
    fn from(info: Option<MemoryInfo>) -> Self {
        let Some(info) = info else {
            return Self::default();
        };
        let usage_percent = if info.js_heap_size_limit == 0 {
            0.0
        } else {
            info.used_js_heap_size as f64 / info.js_heap_size_limit as f64 * 100.0
        };
        Self {
            used_js_heap_size: info.used_js_heap_size,
            total_js_heap_size: info.total_js_heap_size,
            js_heap_size_limit: info.js_heap_size_limit,
            usage_percent,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionTiming {
    pub script_parsing: f64,
    pub script_execution: f64,
    pub dom_content_loaded: f64,
    pub page_load: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCount {
    pub javascript: usize,
    pub css: usize,
    pub images: usize,
    pub fonts: usize,
    pub other: usize,
    /// Entries started by `fetch` or `XMLHttpRequest`
    pub fetch: usize,
    pub total: usize,
}

/// Estimated savings from compression of text-like resources, in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionStats {
    pub gzip_savings: f64,
    /// Estimated as `gzip_savings * 1.15`; not a measurement
    pub brotli_savings: f64,
    pub compressible_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_usage_degrades_to_zero() {
        assert_eq!(MemoryUsage::from(None), MemoryUsage::default());

        let usage = MemoryUsage::from(Some(MemoryInfo {
            used_js_heap_size: 50,
            total_js_heap_size: 80,
            js_heap_size_limit: 200,
        }));
        assert_eq!(usage.usage_percent, 25.0);

        let no_limit = MemoryUsage::from(Some(MemoryInfo {
            used_js_heap_size: 50,
            total_js_heap_size: 80,
            js_heap_size_limit: 0,
        }));
        assert_eq!(no_limit.usage_percent, 0.0);
    }
}
