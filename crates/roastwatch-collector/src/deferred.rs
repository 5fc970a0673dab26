use std::time::Duration;

/// A single cancellable deadline on the epoch-millisecond timeline.
///
/// Scheduling always clears the previous deadline first, so at most one
/// firing is ever pending. The owner drives it by calling [`fire_if_due`]
/// with the current time.
///
/// [`fire_if_due`]: DeferredTask::fire_if_due
#[derive(Debug, Clone)]
pub struct DeferredTask {
    delay_ms: i64,
    deadline: Option<i64>,
}

impl DeferredTask {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay_ms: i64::try_from(delay.as_millis()).unwrap_or(i64::MAX),
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.max(0) as u64)
    }

    /// Restart the quiet period from `now_ms`; returns whether a pending
    /// deadline was replaced
    pub fn schedule(&mut self, now_ms: i64) -> bool {
        self.schedule_at(now_ms.saturating_add(self.delay_ms))
    }

    pub fn schedule_at(&mut self, deadline_ms: i64) -> bool {
        let replaced = self.cancel();
        self.deadline = Some(deadline_ms);
        replaced
    }

    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn deadline(&self) -> Option<i64> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Milliseconds until the deadline, zero once it has passed
    pub fn remaining(&self, now_ms: i64) -> Option<Duration> {
        self.deadline
            .map(|d| Duration::from_millis((d - now_ms).max(0) as u64))
    }

    /// Consume the deadline if it has been reached
    pub fn fire_if_due(&mut self, now_ms: i64) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now_ms => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
