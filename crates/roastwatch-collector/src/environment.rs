use roastwatch_core::report::{DeviceInfo, UserInteractions};
use roastwatch_core::timing::{MemoryInfo, NavigationTiming, ResourceEntry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Optional device and network hints; anything missing degrades to "unknown"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceHints {
    pub platform: Option<String>,
    pub device_memory: Option<f64>,
    pub hardware_concurrency: Option<u32>,
    pub connection_type: Option<String>,
    pub effective_type: Option<String>,
    pub viewport_width: Option<u32>,
    pub viewport_height: Option<u32>,
}

/// Raw interaction counters reported by the page
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractionCounters {
    pub click_count: u32,
    pub scroll_depth: f64,
    pub time_on_page: f64,
}

impl From<InteractionCounters> for UserInteractions {
    fn from(c: InteractionCounters) -> Self {
        UserInteractions::new(c.click_count, c.scroll_depth, c.time_on_page)
    }
}

/// The page being observed.
///
/// Every signal except the URL and user agent is optional, and collectors
/// must tolerate its absence.
pub trait HostEnvironment: Send + Sync {
    fn url(&self) -> String;
    fn user_agent(&self) -> String;
    fn navigation_timing(&self) -> Option<NavigationTiming>;
    fn resource_entries(&self) -> Vec<ResourceEntry>;
    fn memory(&self) -> Option<MemoryInfo>;
    fn device_hints(&self) -> DeviceHints;
    fn interactions(&self) -> Option<InteractionCounters>;
    /// Whether the page has finished loading
    fn is_loaded(&self) -> bool;

    /// Device snapshot with mobile and low-end classification applied
    fn device_info(&self) -> DeviceInfo {
        let hints = self.device_hints();
        let user_agent = self.user_agent();
        let defaults = DeviceInfo::default();

        DeviceInfo {
            is_mobile: DeviceInfo::classify_mobile(&user_agent),
            is_low_end_device: DeviceInfo::classify_low_end(
                hints.device_memory,
                hints.hardware_concurrency,
            ),
            user_agent,
            platform: hints.platform.unwrap_or(defaults.platform),
            device_memory: hints.device_memory,
            hardware_concurrency: hints.hardware_concurrency,
            connection_type: hints.connection_type.unwrap_or(defaults.connection_type),
            effective_type: hints.effective_type,
            navigation_type: self.navigation_timing().and_then(|t| t.navigation_type),
            viewport_width: hints.viewport_width,
            viewport_height: hints.viewport_height,
        }
    }
}

/// Optional page signals whose absence is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instrumentation {
    Memory,
    NavigationTiming,
}

impl fmt::Display for Instrumentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instrumentation::Memory => write!(f, "Memory introspection"),
            Instrumentation::NavigationTiming => write!(f, "Navigation timing"),
        }
    }
}

/// Warns once per missing signal for the lifetime of a collector
#[derive(Debug, Default)]
pub struct UnavailableWarnings {
    memory: AtomicBool,
    navigation_timing: AtomicBool,
    logged: AtomicUsize,
}

impl UnavailableWarnings {
    /// Pass `value` through, warning the first time `source` is missing
    pub fn check<T>(&self, source: Instrumentation, value: Option<T>) -> Option<T> {
        if value.is_none() && !self.flag(source).swap(true, Ordering::Relaxed) {
            self.logged.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("{} unavailable; reporting zeros", source);
        }
        value
    }

    pub fn warned(&self, source: Instrumentation) -> bool {
        self.flag(source).load(Ordering::Relaxed)
    }

    /// Number of warnings logged so far
    pub fn logged(&self) -> usize {
        self.logged.load(Ordering::Relaxed)
    }

    fn flag(&self, source: Instrumentation) -> &AtomicBool {
        match source {
            Instrumentation::Memory => &self.memory,
            Instrumentation::NavigationTiming => &self.navigation_timing,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct PageState {
    url: String,
    user_agent: String,
    navigation_timing: Option<NavigationTiming>,
    resources: Vec<ResourceEntry>,
    memory: Option<MemoryInfo>,
    hints: DeviceHints,
    interactions: Option<InteractionCounters>,
    loaded: bool,
}

/// In-process environment whose signals are set directly.
///
/// Clones share the same page state, so a test or replay driver can keep a
/// handle and mutate the page while collectors read from it.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    state: Arc<RwLock<PageState>>,
}

impl StaticEnvironment {
    pub fn new(url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        let env = Self::default();
        env.update(|s| {
            s.url = url.into();
            s.user_agent = user_agent.into();
        });
        env
    }

    pub fn set_url(&self, url: impl Into<String>) {
        let url = url.into();
        self.update(|s| s.url = url);
    }

    pub fn set_navigation_timing(&self, timing: NavigationTiming) {
        self.update(|s| {
            s.loaded = s.loaded || timing.is_complete();
            s.navigation_timing = Some(timing);
        });
    }

    pub fn set_resources(&self, resources: Vec<ResourceEntry>) {
        self.update(|s| s.resources = resources);
    }

    pub fn push_resource(&self, resource: ResourceEntry) {
        self.update(|s| s.resources.push(resource));
    }

    pub fn set_memory(&self, memory: Option<MemoryInfo>) {
        self.update(|s| s.memory = memory);
    }

    pub fn set_device_hints(&self, hints: DeviceHints) {
        self.update(|s| s.hints = hints);
    }

    pub fn set_interactions(&self, interactions: InteractionCounters) {
        self.update(|s| s.interactions = Some(interactions));
    }

    pub fn set_loaded(&self, loaded: bool) {
        self.update(|s| s.loaded = loaded);
    }

    fn update(&self, f: impl FnOnce(&mut PageState)) {
        match self.state.write() {
            Ok(mut state) => f(&mut state),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn read<R>(&self, f: impl FnOnce(&PageState) -> R) -> R {
        match self.state.read() {
            Ok(state) => f(&state),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }
}

impl HostEnvironment for StaticEnvironment {
    fn url(&self) -> String {
        self.read(|s| s.url.clone())
    }

    fn user_agent(&self) -> String {
        self.read(|s| s.user_agent.clone())
    }

    fn navigation_timing(&self) -> Option<NavigationTiming> {
        self.read(|s| s.navigation_timing.clone())
    }

    fn resource_entries(&self) -> Vec<ResourceEntry> {
        self.read(|s| s.resources.clone())
    }

    fn memory(&self) -> Option<MemoryInfo> {
        self.read(|s| s.memory)
    }

    fn device_hints(&self) -> DeviceHints {
        self.read(|s| s.hints.clone())
    }

    fn interactions(&self) -> Option<InteractionCounters> {
        self.read(|s| s.interactions)
    }

    fn is_loaded(&self) -> bool {
        self.read(|s| s.loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_hints_degrade_to_unknown() {
        let env = StaticEnvironment::new("https://journal.example/", "Mozilla/5.0 (X11; Linux)");
        let info = env.device_info();

        assert_eq!(info.connection_type, "unknown");
        assert_eq!(info.platform, "unknown");
        assert!(!info.is_mobile);
        assert!(!info.is_low_end_device);
        assert_eq!(info.device_memory, None);
    }

    #[test]
    fn test_device_classification() {
        let env = StaticEnvironment::new(
            "https://journal.example/",
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)",
        );
        env.set_device_hints(DeviceHints {
            device_memory: Some(2.0),
            hardware_concurrency: Some(6),
            connection_type: Some("cellular".to_string()),
            effective_type: Some("3g".to_string()),
            ..Default::default()
        });

        let info = env.device_info();
        assert!(info.is_mobile);
        assert!(info.is_low_end_device);
        assert_eq!(info.connection_type, "cellular");
        assert_eq!(info.effective_type.as_deref(), Some("3g"));
    }

    #[test]
    fn test_missing_signal_warns_once() {
        let warnings = UnavailableWarnings::default();
        assert_eq!(warnings.check::<MemoryInfo>(Instrumentation::Memory, None), None);
        assert_eq!(warnings.check::<MemoryInfo>(Instrumentation::Memory, None), None);
        assert!(warnings.warned(Instrumentation::Memory));
        assert!(!warnings.warned(Instrumentation::NavigationTiming));
        assert_eq!(warnings.logged(), 1);

        assert_eq!(warnings.check(Instrumentation::NavigationTiming, Some(3)), Some(3));
        assert_eq!(warnings.logged(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let env = StaticEnvironment::new("https://journal.example/", "agent");
        let handle = env.clone();
        assert!(!env.is_loaded());

        handle.set_navigation_timing(NavigationTiming {
            load_event_end: 900.0,
            navigation_type: Some("navigate".to_string()),
            ..Default::default()
        });

        assert!(env.is_loaded());
        assert_eq!(env.device_info().navigation_type.as_deref(), Some("navigate"));
    }
}
