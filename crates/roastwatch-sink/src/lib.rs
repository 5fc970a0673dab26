pub mod backend;
pub mod error;
pub mod sink;

pub use backend::{
    Breadcrumb, Level, Measurement, MemoryBackend, MonitoringBackend, SinkEvent, TracingBackend,
};
pub use error::{Error, Result};
pub use sink::TelemetrySink;
