mod normalize;
mod types;

pub use normalize::{MetricContext, Thresholds, normalize, rate};
pub use types::*;
