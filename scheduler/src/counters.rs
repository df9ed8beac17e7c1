use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Minimal counters for operational visibility. Does not affect behavior.
#[derive(Clone, Default)]
pub struct PollCounters {
    pub ticks: Arc<AtomicU64>,
    pub fetch_ok: Arc<AtomicU64>,
    pub fetch_failed: Arc<AtomicU64>,
    pub readings_skipped: Arc<AtomicU64>,
    /// Results that arrived after `stop()` and were thrown away.
    pub results_discarded: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub ticks: u64,
    pub fetch_ok: u64,
    pub fetch_failed: u64,
    pub readings_skipped: u64,
    pub results_discarded: u64,
}

impl PollCounters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            fetch_ok: self.fetch_ok.load(Ordering::Relaxed),
            fetch_failed: self.fetch_failed.load(Ordering::Relaxed),
            readings_skipped: self.readings_skipped.load(Ordering::Relaxed),
            results_discarded: self.results_discarded.load(Ordering::Relaxed),
        }
    }
}
