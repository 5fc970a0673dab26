use super::collect::collect_snapshot;
use crate::deferred::DeferredTask;
use crate::environment::{HostEnvironment, Instrumentation, UnavailableWarnings};
use roastwatch_core::analysis::{BundleAnalysis, BundleTrend, analyze_bundle, bundle_trend};
use roastwatch_core::bundle::BundleSnapshot;
use roastwatch_core::clock::Clock;
use roastwatch_core::config::TelemetryConfig;
use roastwatch_core::history::BoundedHistory;
use roastwatch_core::listeners::{ListenerRegistry, ListenerResult, Subscription};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    /// Started before the page finished loading
    AwaitingLoad,
    Running,
    Stopped,
}

/// Periodic sampler of resource weight, heap usage and execution timing
pub struct ResourceMonitor {
    env: Arc<dyn HostEnvironment>,
    clock: Arc<dyn Clock>,
    settle_delay_ms: i64,
    resample_interval_ms: Option<i64>,
    state: MonitorState,
    next_sample: DeferredTask,
    history: BoundedHistory<BundleSnapshot>,
    observers: ListenerRegistry<BundleSnapshot>,
    unavailable: UnavailableWarnings,
}

impl ResourceMonitor {
    pub fn new(
        env: Arc<dyn HostEnvironment>,
        clock: Arc<dyn Clock>,
        config: &TelemetryConfig,
    ) -> Self {
        Self {
            env,
            clock,
            settle_delay_ms: clamp_ms(config.settle_delay_ms),
            resample_interval_ms: config.resample_interval_ms.map(clamp_ms),
            state: MonitorState::Idle,
            next_sample: DeferredTask::new(config.settle_delay()),
            history: BoundedHistory::new(config.bundle_history_capacity),
            observers: ListenerRegistry::new(),
            unavailable: UnavailableWarnings::default(),
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Begin monitoring; calling it again while active does nothing.
    ///
    /// Samples immediately when the page has already loaded, otherwise waits
    /// for [`notify_loaded`](Self::notify_loaded) plus the settle delay.
    pub fn start(&mut self) -> Option<BundleSnapshot> {
        if matches!(self.state, MonitorState::AwaitingLoad | MonitorState::Running) {
            return None;
        }

        if self.env.is_loaded() {
            tracing::debug!("Page already loaded; sampling resources now");
            self.state = MonitorState::Running;
            let snapshot = self.collect_now();
            self.schedule_resample();
            Some(snapshot)
        } else {
            tracing::debug!("Waiting for load before sampling resources");
            self.state = MonitorState::AwaitingLoad;
            None
        }
    }

    /// The page's load event fired
    pub fn notify_loaded(&mut self) {
        if self.state == MonitorState::AwaitingLoad {
            self.state = MonitorState::Running;
            self.next_sample
                .schedule_at(self.clock.now_ms().saturating_add(self.settle_delay_ms));
        }
    }

    /// Epoch-millisecond deadline of the next scheduled sample
    pub fn next_sample_at(&self) -> Option<i64> {
        self.next_sample.deadline()
    }

    /// Take a scheduled sample if one is due
    pub fn poll(&mut self) -> Option<BundleSnapshot> {
        if self.state == MonitorState::AwaitingLoad && self.env.is_loaded() {
            self.notify_loaded();
        }
        if self.state != MonitorState::Running
            || !self.next_sample.fire_if_due(self.clock.now_ms())
        {
            return None;
        }

        let snapshot = self.collect_now();
        self.schedule_resample();
        Some(snapshot)
    }

    /// Stop sampling; returns whether the monitor was active
    pub fn stop(&mut self) -> bool {
        self.next_sample.cancel();
        let was_active = matches!(self.state, MonitorState::AwaitingLoad | MonitorState::Running);
        if was_active {
            tracing::debug!("Resource monitoring stopped");
            self.state = MonitorState::Stopped;
        }
        was_active
    }

    /// Current snapshot, without recording it
    pub fn collect_metrics(&self) -> BundleSnapshot {
        let navigation = self
            .unavailable
            .check(Instrumentation::NavigationTiming, self.env.navigation_timing());
        let memory = self
            .unavailable
            .check(Instrumentation::Memory, self.env.memory());
        collect_snapshot(
            self.clock.now_ms(),
            &self.env.resource_entries(),
            navigation.as_ref(),
            memory,
        )
    }

    /// Missing signals already reported
    pub fn unavailable(&self) -> &UnavailableWarnings {
        &self.unavailable
    }

    /// Sample, append to history and notify observers
    pub fn collect_now(&mut self) -> BundleSnapshot {
        let snapshot = self.collect_metrics();
        self.history.push(snapshot.clone());

        let outcome = self.observers.dispatch(&snapshot);
        tracing::debug!(
            "Resource sample: {:.0}KB across {} resources ({} observers, {} failed)",
            snapshot.bundle_size.total_kb(),
            snapshot.resource_count.total,
            outcome.delivered,
            outcome.failed
        );
        snapshot
    }

    pub fn subscribe<F>(&mut self, observer: F) -> Subscription
    where
        F: FnMut(&BundleSnapshot) -> ListenerResult + Send + 'static,
    {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.observers.unsubscribe(subscription)
    }

    pub fn history(&self) -> &BoundedHistory<BundleSnapshot> {
        &self.history
    }

    /// Score the latest sample against the one before it
    pub fn analyze(&self) -> Option<BundleAnalysis> {
        self.history
            .latest()
            .map(|latest| analyze_bundle(latest, self.history.previous()))
    }

    pub fn trend(&self) -> Option<BundleTrend> {
        bundle_trend(&self.history.to_vec())
    }

    fn schedule_resample(&mut self) {
        if let Some(interval) = self.resample_interval_ms {
            self.next_sample
                .schedule_at(self.clock.now_ms().saturating_add(interval));
        }
    }
}

fn clamp_ms(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}
