pub mod analysis;
pub mod budget;
pub mod bundle;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod listeners;
pub mod report;
pub mod timing;
pub mod vitals;

pub use error::{Error, Result};
