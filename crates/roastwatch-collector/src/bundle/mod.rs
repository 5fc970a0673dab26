mod collect;
mod monitor;

pub use collect::{ResourceKind, classify, collect_snapshot, is_text_like};
pub use monitor::{MonitorState, ResourceMonitor};
