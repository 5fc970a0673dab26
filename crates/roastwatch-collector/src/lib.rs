pub mod aggregator;
pub mod bundle;
pub mod deferred;
pub mod environment;
pub mod error;
pub mod har;
pub mod service;
pub mod session;

pub use aggregator::MetricAggregator;
pub use bundle::ResourceMonitor;
pub use deferred::DeferredTask;
pub use environment::{HostEnvironment, Instrumentation, StaticEnvironment, UnavailableWarnings};
pub use error::{Error, Result};
pub use har::HarEnvironment;
pub use service::{AggregatorService, MetricSender};
pub use session::{ReportOutcome, TelemetrySession};
