/// Statistics tracking for the event bus
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Event bus statistics for monitoring
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStats {
    /// Number of listeners currently installed
    pub total_listeners: usize,
    /// Number of registered subscriber targets
    pub total_targets: usize,
    /// Posts delivered while running
    pub events_posted: u64,
    /// Posts ignored because the bus was stopped
    pub events_ignored: u64,
    /// Listener invocations, successful or not
    pub listener_invocations: u64,
    /// Invocations that returned an error or panicked
    pub listener_failures: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub(crate) events_posted: AtomicU64,
    pub(crate) events_ignored: AtomicU64,
    pub(crate) listener_invocations: AtomicU64,
    pub(crate) listener_failures: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, total_listeners: usize, total_targets: usize) -> BusStats {
        BusStats {
            total_listeners,
            total_targets,
            events_posted: self.events_posted.load(Ordering::Relaxed),
            events_ignored: self.events_ignored.load(Ordering::Relaxed),
            listener_invocations: self.listener_invocations.load(Ordering::Relaxed),
            listener_failures: self.listener_failures.load(Ordering::Relaxed),
        }
    }
}
