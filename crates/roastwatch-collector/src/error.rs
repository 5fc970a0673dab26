use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] roastwatch_core::Error),

    #[error("Failed to read capture: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse capture: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid HAR structure: {0}")]
    InvalidHar(String),

    #[error("Aggregator service stopped")]
    ServiceStopped,
}

pub type Result<T> = std::result::Result<T, Error>;
