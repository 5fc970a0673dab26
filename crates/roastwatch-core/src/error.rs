use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to access telemetry data: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse telemetry data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown metric name: {0}")]
    UnknownMetric(String),

    #[error("Invalid value {value} for metric {name}")]
    InvalidValue { name: String, value: f64 },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
