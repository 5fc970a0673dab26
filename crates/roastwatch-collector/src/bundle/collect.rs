use lazy_static::lazy_static;
use regex::Regex;
use roastwatch_core::bundle::{
    BundleSize, BundleSnapshot, CompressionStats, ExecutionTiming, MemoryUsage, ResourceCount,
};
use roastwatch_core::timing::{MemoryInfo, NavigationTiming, ResourceEntry, span};
use url::Url;

/// Estimated brotli advantage over gzip; a heuristic, not a measurement
const BROTLI_FACTOR: f64 = 1.15;

lazy_static! {
    static ref SCRIPT_PATTERN: Regex = Regex::new(r"(?i)\.(m?js|cjs|jsx)$").unwrap();
    static ref STYLE_PATTERN: Regex = Regex::new(r"(?i)\.css$").unwrap();
    static ref IMAGE_PATTERN: Regex =
        Regex::new(r"(?i)\.(png|jpe?g|gif|svg|webp|avif|ico|bmp)$").unwrap();
    static ref FONT_PATTERN: Regex = Regex::new(r"(?i)\.(woff2?|ttf|otf|eot)$").unwrap();
    static ref TEXT_PATTERN: Regex =
        Regex::new(r"(?i)\.(m?js|cjs|jsx|css|html?|json|xml|svg|txt|map)$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Javascript,
    Css,
    Image,
    Font,
    Other,
}

fn resource_path(name: &str) -> String {
    match Url::parse(name) {
        Ok(url) => url.path().to_string(),
        Err(_) => name.split(['?', '#']).next().unwrap_or_default().to_string(),
    }
}

/// Bucket a resource by the file extension of its URL path
pub fn classify(name: &str) -> ResourceKind {
    let path = resource_path(name);
    if SCRIPT_PATTERN.is_match(&path) {
        ResourceKind::Javascript
    } else if STYLE_PATTERN.is_match(&path) {
        ResourceKind::Css
    } else if IMAGE_PATTERN.is_match(&path) {
        ResourceKind::Image
    } else if FONT_PATTERN.is_match(&path) {
        ResourceKind::Font
    } else {
        ResourceKind::Other
    }
}

/// Whether a resource is text that a server would normally compress
pub fn is_text_like(name: &str) -> bool {
    TEXT_PATTERN.is_match(&resource_path(name))
}

/// Bytes attributed to a resource: transferred size, or the decoded size when
/// it came from cache
fn resource_bytes(entry: &ResourceEntry) -> u64 {
    if entry.transfer_size > 0 {
        entry.transfer_size
    } else {
        entry.decoded_body_size
    }
}

/// Take a snapshot of resource loading, memory and execution timing.
///
/// Pure over its inputs; missing navigation timing or heap introspection
/// produce zeros.
pub fn collect_snapshot(
    timestamp: i64,
    entries: &[ResourceEntry],
    navigation: Option<&NavigationTiming>,
    memory: Option<MemoryInfo>,
) -> BundleSnapshot {
    let mut size = BundleSize::default();
    let mut count = ResourceCount::default();

    for entry in entries {
        let bytes = resource_bytes(entry);
        let (bucket, counter) = match classify(&entry.name) {
            ResourceKind::Javascript => (&mut size.javascript, &mut count.javascript),
            ResourceKind::Css => (&mut size.css, &mut count.css),
            ResourceKind::Image => (&mut size.images, &mut count.images),
            ResourceKind::Font => (&mut size.fonts, &mut count.fonts),
            ResourceKind::Other => (&mut size.other, &mut count.other),
        };
        *bucket += bytes;
        *counter += 1;

        size.total += bytes;
        count.total += 1;
        if entry.is_fetch() {
            count.fetch += 1;
        }
    }

    BundleSnapshot {
        timestamp,
        bundle_size: size,
        memory_usage: MemoryUsage::from(memory),
        execution_timing: navigation.map(execution_timing).unwrap_or_default(),
        resource_count: count,
        compression_stats: compression_stats(entries),
    }
}

fn execution_timing(nav: &NavigationTiming) -> ExecutionTiming {
    ExecutionTiming {
        script_parsing: span(nav.response_end, nav.dom_interactive),
        script_execution: span(nav.dom_interactive, nav.dom_content_loaded_event_start),
        dom_content_loaded: span(
            nav.dom_content_loaded_event_start,
            nav.dom_content_loaded_event_end,
        ),
        page_load: span(nav.start_time, nav.load_event_end),
    }
}

fn compression_stats(entries: &[ResourceEntry]) -> CompressionStats {
    let (decoded, transferred) = entries
        .iter()
        .filter(|e| e.transfer_size > 0 && e.decoded_body_size > 0 && is_text_like(&e.name))
        .fold((0u64, 0u64), |(d, t), e| (d + e.decoded_body_size, t + e.transfer_size));

    if decoded == 0 {
        return CompressionStats::default();
    }

    let gzip_savings = ((decoded as f64 - transferred as f64) / decoded as f64 * 100.0).max(0.0);
    CompressionStats {
        gzip_savings,
        brotli_savings: (gzip_savings * BROTLI_FACTOR).min(100.0),
        compressible_bytes: decoded,
    }
}
