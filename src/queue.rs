//! The command queue: the single serialization point.
//!
//! Many producers push [`AdmittedCommand`]s; exactly one consumer (the
//! controller thread) pops them in FIFO order.  The queue is unbounded:
//! backlog is logged once it crosses a threshold, never throttled or
//! dropped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::warn;
use parking_lot::{Condvar, Mutex};

use crate::app::commands::AdmittedCommand;

#[derive(Debug, Default)]
struct Inner {
    items: VecDeque<AdmittedCommand>,
    stopped: bool,
}

#[derive(Debug)]
pub struct CommandQueue {
    inner: Mutex<Inner>,
    available: Condvar,
    peak_depth: AtomicUsize,
    warn_depth: usize,
}

impl CommandQueue {
    /// `warn_depth` is the backlog size at which a warning is logged.
    pub fn new(warn_depth: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            available: Condvar::new(),
            peak_depth: AtomicUsize::new(0),
            warn_depth,
        }
    }

    /// Append and wake the consumer.  Never blocks on the consumer and never
    /// fails.
    pub fn enqueue(&self, cmd: AdmittedCommand) {
        let depth = {
            let mut inner = self.inner.lock();
            inner.items.push_back(cmd);
            inner.items.len()
        };
        self.available.notify_one();

        self.peak_depth.fetch_max(depth, Ordering::Relaxed);
        if self.warn_depth > 0 && depth == self.warn_depth {
            warn!("CommandQueue: backlog reached {} commands", depth);
        }
    }

    /// Block until a command is available or the queue is stopped.
    ///
    /// Returns `None` once stopped, even if commands remain; collect those
    /// with [`drain`](Self::drain).
    pub fn dequeue(&self) -> Option<AdmittedCommand> {
        let mut inner = self.inner.lock();
        loop {
            if inner.stopped {
                return None;
            }
            if let Some(cmd) = inner.items.pop_front() {
                return Some(cmd);
            }
            self.available.wait(&mut inner);
        }
    }

    /// Request the consumer to stop after its current wait.
    pub fn stop(&self) {
        self.inner.lock().stopped = true;
        self.available.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.lock().stopped
    }

    /// Remove and return everything still queued.
    pub fn drain(&self) -> Vec<AdmittedCommand> {
        self.inner.lock().items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deepest backlog observed since construction.
    pub fn peak_depth(&self) -> usize {
        self.peak_depth.load(Ordering::Relaxed)
    }
}
