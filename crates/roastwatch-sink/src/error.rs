use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Monitoring backend unavailable: {0}")]
    Unavailable(String),

    #[error("Monitoring backend rejected event: {0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, Error>;
