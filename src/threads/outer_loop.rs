//! Outer-loop clock: the periodic Update producer.
//!
//! Wall-clock paced, not completion paced.  Every tick it reads the summary
//! state and, if active, enqueues one Update; while inactive it skips
//! silently.  If execution falls behind, Updates accumulate in the queue.
//!
//! [`PeriodicTicker`] itself never bursts: when the clock thread wakes more
//! than one period late, the missed ticks are skipped and the schedule
//! restarts from now.  Only ticks that actually fire enqueue work.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};

use super::StopToken;
use crate::app::commands::AdmittedCommand;
use crate::fsm::SummaryStateReader;
use crate::queue::CommandQueue;

/// Source of clock ticks.
pub trait TickSource: Send {
    /// Block until the next tick.  Returns `false` if `stop` was raised.
    fn wait_tick(&mut self, stop: &StopToken) -> bool;
}

/// Deadline-based software timer.  Does not drift with wake-up latency.
#[derive(Debug)]
pub struct PeriodicTicker {
    period: Duration,
    next: Instant,
}

impl PeriodicTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
        }
    }
}

impl TickSource for PeriodicTicker {
    fn wait_tick(&mut self, stop: &StopToken) -> bool {
        if stop.wait_until(self.next) {
            return false;
        }
        self.next += self.period;
        let now = Instant::now();
        if self.next + self.period < now {
            // More than a period behind: drop the missed ticks.
            self.next = now + self.period;
        }
        true
    }
}

pub struct OuterLoop {
    queue: Arc<CommandQueue>,
    state: SummaryStateReader,
    ticks: u64,
    emitted: u64,
}

impl OuterLoop {
    pub fn new(queue: Arc<CommandQueue>, state: SummaryStateReader) -> Self {
        Self {
            queue,
            state,
            ticks: 0,
            emitted: 0,
        }
    }

    /// One clock tick.  Returns whether an Update was enqueued.
    pub fn on_tick(&mut self) -> bool {
        self.ticks += 1;
        if !self.state.is_active() {
            return false;
        }
        self.queue.enqueue(AdmittedCommand::update());
        self.emitted += 1;
        true
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Run until `stop` is raised.
    pub fn run(mut self, mut ticker: impl TickSource, stop: &StopToken) {
        info!("OuterLoop: running");
        self.queue.enqueue(AdmittedCommand::update());
        while ticker.wait_tick(stop) {
            self.on_tick();
        }
        debug!(
            "OuterLoop: stopped after {} ticks, {} updates",
            self.ticks, self.emitted
        );
    }
}
