//! Mock adapters for integration tests.
//!
//! `MockFpga` echoes a status response for every requested ILC and records
//! every command-FIFO frame.  Its behaviour is steered at run time through
//! a shared [`FpgaControl`], so a test can inject failures or panics while
//! the node is running.  Every port call is wrapped in an in-flight counter
//! that acts as a second overlap detector.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thermalctl::app::events::AppEvent;
use thermalctl::app::ports::{EventSink, FpgaPort};
use thermalctl::error::HardwareError;
use thermalctl::ilc::{REQUEST_WORDS, RESPONSE_WORDS};
use thermalctl::threads::StopToken;
use thermalctl::threads::outer_loop::TickSource;

// ── FPGA ──────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct FpgaControl {
    pub fail_init: AtomicBool,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
    pub panic_on_write: AtomicBool,
    /// Extra latency per command-FIFO write, in milliseconds.
    pub write_delay_ms: AtomicU64,
    pub command_writes: Mutex<Vec<Vec<u16>>>,
    pub status_requests: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub closed: AtomicBool,
    pub finalized: AtomicBool,
}

impl FpgaControl {
    pub fn status_requests(&self) -> usize {
        self.status_requests.load(Ordering::SeqCst)
    }

    pub fn command_write_count(&self) -> usize {
        self.command_writes.lock().len()
    }

    pub fn last_mode(&self) -> Option<u16> {
        self.command_writes.lock().last().and_then(|f| f.get(2).copied())
    }
}

struct InFlight<'a>(&'a FpgaControl);

impl<'a> InFlight<'a> {
    fn enter(control: &'a FpgaControl) -> Self {
        let now = control.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        control.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(control)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MockFpga {
    control: Arc<FpgaControl>,
    responses: VecDeque<u16>,
}

impl MockFpga {
    pub fn new() -> (Self, Arc<FpgaControl>) {
        let control = Arc::new(FpgaControl::default());
        (
            Self {
                control: Arc::clone(&control),
                responses: VecDeque::new(),
            },
            control,
        )
    }
}

impl FpgaPort for MockFpga {
    fn initialize(&mut self) -> Result<(), HardwareError> {
        if self.control.fail_init.load(Ordering::SeqCst) {
            return Err(HardwareError::Init("mock init failure"));
        }
        Ok(())
    }

    fn open(&mut self, _bitfile_dir: &str) -> Result<(), HardwareError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), HardwareError> {
        self.control.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), HardwareError> {
        self.control.finalized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn write_command_fifo(&mut self, data: &[u16], _timeout: Duration) -> Result<(), HardwareError> {
        let _guard = InFlight::enter(&self.control);
        let delay = self.control.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        if self.control.panic_on_write.load(Ordering::SeqCst) {
            panic!("mock FPGA: injected panic");
        }
        if self.control.fail_writes.load(Ordering::SeqCst) {
            return Err(HardwareError::FifoWrite);
        }
        self.control.command_writes.lock().push(data.to_vec());
        Ok(())
    }

    fn write_request_fifo(&mut self, data: &[u16], _timeout: Duration) -> Result<(), HardwareError> {
        let _guard = InFlight::enter(&self.control);
        self.control.status_requests.fetch_add(1, Ordering::SeqCst);
        for frame in data.chunks_exact(REQUEST_WORDS) {
            self.responses.extend([frame[0], 2, 25, 1500, 2100]);
        }
        Ok(())
    }

    fn read_u16_response_fifo(
        &mut self,
        data: &mut [u16],
        _timeout: Duration,
    ) -> Result<(), HardwareError> {
        let _guard = InFlight::enter(&self.control);
        if self.control.fail_reads.load(Ordering::SeqCst) {
            self.responses.clear();
            return Err(HardwareError::Timeout);
        }
        if self.responses.len() < data.len() || data.len() % RESPONSE_WORDS != 0 {
            return Err(HardwareError::Timeout);
        }
        let n = data.len();
        for (dst, src) in data.iter_mut().zip(self.responses.drain(..n)) {
            *dst = src;
        }
        Ok(())
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<AppEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AppEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.lock().push(event.clone());
    }
}

// ── Manual clock ──────────────────────────────────────────────

/// Tick source driven by the test.  [`ManualClock::tick`] returns once the
/// outer loop has handled the tick and is waiting for the next one.
pub struct ManualTicker {
    ticks: Receiver<()>,
    ready: Sender<()>,
    delivered: bool,
}

pub struct ManualClock {
    ticks: Sender<()>,
    ready: Receiver<()>,
}

pub fn manual_clock() -> (ManualClock, ManualTicker) {
    let (tick_tx, tick_rx) = mpsc::channel();
    let (ready_tx, ready_rx) = mpsc::channel();
    (
        ManualClock {
            ticks: tick_tx,
            ready: ready_rx,
        },
        ManualTicker {
            ticks: tick_rx,
            ready: ready_tx,
            delivered: false,
        },
    )
}

impl ManualClock {
    pub fn tick(&self) {
        self.ticks.send(()).expect("outer loop gone");
        self.ready
            .recv_timeout(Duration::from_secs(5))
            .expect("outer loop did not handle tick");
    }
}

impl TickSource for ManualTicker {
    fn wait_tick(&mut self, stop: &StopToken) -> bool {
        if std::mem::take(&mut self.delivered) {
            let _ = self.ready.send(());
        }
        loop {
            if stop.is_cancelled() {
                return false;
            }
            match self.ticks.recv_timeout(Duration::from_millis(5)) {
                Ok(()) => {
                    self.delivered = true;
                    return !stop.is_cancelled();
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    stop.wait();
                    return false;
                }
            }
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}
