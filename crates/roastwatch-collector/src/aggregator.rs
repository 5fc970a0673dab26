use crate::Result;
use crate::deferred::DeferredTask;
use crate::environment::{HostEnvironment, Instrumentation, UnavailableWarnings};
use roastwatch_core::budget::PerformanceBudget;
use roastwatch_core::clock::Clock;
use roastwatch_core::config::TelemetryConfig;
use roastwatch_core::listeners::{ListenerRegistry, ListenerResult, Subscription};
use roastwatch_core::report::Report;
use roastwatch_core::vitals::{Metric, MetricContext, RawVital, VitalName, normalize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn generate_id(prefix: &str, now_ms: i64) -> String {
    format!("{}_{}_{}", prefix, now_ms, NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// Debounced collector for one page view.
///
/// Every new vital overwrites the previous value for its name and restarts
/// the quiet period. When the quiet period elapses, [`poll`] builds one
/// [`Report`] from everything collected so far and hands it to each
/// registered listener.
///
/// [`poll`]: MetricAggregator::poll
pub struct MetricAggregator {
    env: Arc<dyn HostEnvironment>,
    clock: Arc<dyn Clock>,
    budget: PerformanceBudget,
    session_id: String,
    page_load_id: String,
    metrics: BTreeMap<VitalName, Metric>,
    flush: DeferredTask,
    listeners: ListenerRegistry<Report>,
    unavailable: UnavailableWarnings,
}

impl MetricAggregator {
    pub fn new(
        env: Arc<dyn HostEnvironment>,
        clock: Arc<dyn Clock>,
        config: &TelemetryConfig,
    ) -> Self {
        let now = clock.now_ms();
        Self {
            env,
            budget: config.budget.clone(),
            session_id: generate_id("session", now),
            page_load_id: generate_id("load", now),
            metrics: BTreeMap::new(),
            flush: DeferredTask::new(config.debounce()),
            listeners: ListenerRegistry::new(),
            unavailable: UnavailableWarnings::default(),
            clock,
        }
    }

    /// Keep an existing session across page views
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn page_load_id(&self) -> &str {
        &self.page_load_id
    }

    /// Normalize a raw callback payload and add it.
    ///
    /// Unknown names and invalid values are rejected without touching the
    /// pending deadline.
    pub fn record(&mut self, raw: &RawVital) -> Result<Metric> {
        let context = MetricContext {
            timestamp: self.clock.now_ms(),
            url: self.env.url(),
            user_agent: self.env.user_agent(),
            session_id: Some(self.session_id.clone()),
            connection_type: self.env.device_hints().connection_type,
        };

        let metric = normalize(raw, &context)?;
        self.add_metric(metric.clone());
        Ok(metric)
    }

    /// Store the latest value for the metric's name and restart the quiet period
    pub fn add_metric(&mut self, metric: Metric) {
        tracing::debug!(
            "Buffered {}={} ({})",
            metric.name,
            metric.value,
            metric.rating()
        );
        self.metrics.insert(metric.name, metric);
        self.flush.schedule(self.clock.now_ms());
    }

    /// Latest buffered value per vital
    pub fn metrics(&self) -> &BTreeMap<VitalName, Metric> {
        &self.metrics
    }

    pub fn on_report<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(&Report) -> ListenerResult + Send + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.listeners.unsubscribe(subscription)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Epoch-millisecond deadline of the pending flush, if any
    pub fn pending_deadline(&self) -> Option<i64> {
        self.flush.deadline()
    }

    /// Flush if the quiet period has elapsed
    pub fn poll(&mut self) -> Option<Report> {
        if self.flush.fire_if_due(self.clock.now_ms()) {
            Some(self.emit())
        } else {
            None
        }
    }

    /// Flush immediately when a flush is pending
    pub fn flush(&mut self) -> Option<Report> {
        if self.flush.cancel() {
            Some(self.emit())
        } else {
            None
        }
    }

    /// Build a report from the current state without notifying anyone
    pub fn build_report(&self) -> Report {
        let metrics: BTreeMap<VitalName, Option<Metric>> = VitalName::ALL
            .into_iter()
            .map(|name| (name, self.metrics.get(&name).cloned()))
            .collect();

        let navigation_timing = self
            .unavailable
            .check(Instrumentation::NavigationTiming, self.env.navigation_timing());
        let budget_status = self.budget.evaluate(&metrics);

        Report {
            timestamp: self.clock.now_ms(),
            url: self.env.url(),
            session_id: self.session_id.clone(),
            page_load_id: self.page_load_id.clone(),
            custom_metrics: navigation_timing
                .as_ref()
                .map(|t| t.derived())
                .unwrap_or_default(),
            device_info: self.env.device_info(),
            user_interactions: self.env.interactions().map(Into::into),
            budget_status,
            navigation_timing,
            metrics,
        }
    }

    /// Missing signals already reported
    pub fn unavailable(&self) -> &UnavailableWarnings {
        &self.unavailable
    }

    /// Flush what is pending once and drop the live state
    pub fn teardown(mut self) -> Option<Report> {
        tracing::debug!("Tearing down aggregator for {}", self.page_load_id);
        self.flush()
    }

    fn emit(&mut self) -> Report {
        let report = self.build_report();
        let outcome = self.listeners.dispatch(&report);

        tracing::info!(
            "Flushed report for {} with {} metrics (score {:.0}); {} listeners notified, {} failed",
            report.url,
            self.metrics.len(),
            report.performance_score(),
            outcome.delivered,
            outcome.failed
        );

        report
    }
}
