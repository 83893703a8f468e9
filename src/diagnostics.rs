//! Runtime diagnostics for the controller thread.
//!
//! Counters are plain atomics so any thread can read them without touching
//! the queue lock.  `max_concurrent` is the overlap detector: it records
//! the highest number of commands ever observed executing at once, which
//! must never exceed one.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct ControllerMetrics {
    executed: AtomicU64,
    failed: AtomicU64,
    panicked: AtomicU64,
    abandoned: AtomicU64,
    in_flight: AtomicUsize,
    max_concurrent: AtomicUsize,
}

impl ControllerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the start of one execution.
    pub fn begin(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.max_concurrent.fetch_max(now, Ordering::AcqRel);
    }

    /// Mark the end of one execution.
    pub fn end(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_panic(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_abandoned(&self, count: usize) {
        self.abandoned.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            executed: self.executed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            max_concurrent: self.max_concurrent.load(Ordering::Acquire),
            queue_depth: 0,
            peak_queue_depth: 0,
        }
    }
}

/// Point-in-time copy of the controller counters plus queue depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub executed: u64,
    pub failed: u64,
    pub panicked: u64,
    /// Left in the queue at shutdown.
    pub abandoned: u64,
    pub max_concurrent: usize,
    pub queue_depth: usize,
    pub peak_queue_depth: usize,
}
