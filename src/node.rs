//! Node: wiring and ordered life-cycle of the control core.
//!
//! ```text
//!   start:    config.validate → FPGA bring-up → controller → clock → poller
//!   shutdown: stop clock + poller → join → stop queue → join controller
//!             → FPGA close/finalize
//! ```
//!
//! FPGA bring-up failure is fatal and surfaces from [`Node::start`].

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{info, warn};

use crate::app::commands::{Command, CommandKind};
use crate::app::ports::{CommandChannel, EventSink, FpgaPort};
use crate::app::service::NodeService;
use crate::config::NodeConfig;
use crate::diagnostics::{ControllerMetrics, MetricsSnapshot};
use crate::error::{AdmissionError, Error, Result};
use crate::fsm::{SummaryState, SummaryStateReader};
use crate::queue::CommandQueue;
use crate::threads::controller::ControllerThread;
use crate::threads::outer_loop::{OuterLoop, PeriodicTicker, TickSource};
use crate::threads::subscriber::CommandPoller;
use crate::threads::{StopToken, join_named, spawn_named};

const CONTROLLER: &str = "controller";
const OUTER_LOOP: &str = "outer-loop";
const SUBSCRIBER: &str = "subscriber";

pub struct Node<F: FpgaPort + 'static, S: EventSink + 'static> {
    queue: Arc<CommandQueue>,
    state: SummaryStateReader,
    metrics: Arc<ControllerMetrics>,
    /// Stops the producer threads.
    producers: StopToken,
    /// Raised by `exitControl`.
    exit: StopToken,
    controller: Option<JoinHandle<NodeService<F, S>>>,
    clock: Option<JoinHandle<()>>,
    poller: Option<JoinHandle<()>>,
}

impl<F, S> Node<F, S>
where
    F: FpgaPort + 'static,
    S: EventSink + Clone + 'static,
{
    /// Bring up the FPGA and start all three threads with a wall-clock
    /// outer loop.
    pub fn start<C>(config: &NodeConfig, fpga: F, channel: Arc<C>, sink: S) -> Result<Self>
    where
        C: CommandChannel + 'static,
    {
        let ticker = PeriodicTicker::new(config.outer_loop_period());
        Self::start_with_ticker(config, fpga, channel, sink, ticker)
    }

    /// As [`start`](Self::start), with a caller-supplied tick source.
    pub fn start_with_ticker<C, T>(
        config: &NodeConfig,
        fpga: F,
        channel: Arc<C>,
        sink: S,
        ticker: T,
    ) -> Result<Self>
    where
        C: CommandChannel + 'static,
        T: TickSource + 'static,
    {
        config.validate()?;

        let exit = StopToken::new();
        let mut service = NodeService::new(fpga, sink.clone(), config, exit.clone());
        service.bring_up()?;

        let queue = Arc::new(CommandQueue::new(config.backlog_warn_depth));
        let metrics = Arc::new(ControllerMetrics::new());
        let mut node = Self {
            queue: Arc::clone(&queue),
            state: service.state_reader(),
            metrics: Arc::clone(&metrics),
            producers: StopToken::new(),
            exit,
            controller: None,
            clock: None,
            poller: None,
        };

        // On any spawn error `node` drops here and tears down what started.
        let controller = ControllerThread::new(Arc::clone(&queue), service, metrics);
        node.controller = Some(spawn_named(CONTROLLER, move || controller.run())?);

        let clock = OuterLoop::new(Arc::clone(&queue), node.state.clone());
        let stop = node.producers.clone();
        node.clock = Some(spawn_named(OUTER_LOOP, move || clock.run(ticker, &stop))?);

        let poller = CommandPoller::new(channel, Arc::clone(&queue), sink);
        let stop = node.producers.clone();
        let interval = config.poll_interval();
        node.poller = Some(spawn_named(SUBSCRIBER, move || poller.run(interval, &stop))?);

        info!("Node: running");
        Ok(node)
    }
}

impl<F: FpgaPort + 'static, S: EventSink + 'static> Node<F, S> {
    /// Diagnostic path: validate and enqueue without an external identifier.
    pub fn submit(&self, kind: CommandKind) -> core::result::Result<(), AdmissionError> {
        match Command::detached(kind).admit() {
            Ok(cmd) => {
                self.queue.enqueue(cmd);
                Ok(())
            }
            Err(rejected) => Err(rejected.acknowledge()),
        }
    }

    pub fn state(&self) -> SummaryState {
        self.state.get()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_depth: self.queue.len(),
            peak_queue_depth: self.queue.peak_depth(),
            ..self.metrics.snapshot()
        }
    }

    pub fn exit_requested(&self) -> bool {
        self.exit.is_cancelled()
    }

    /// Block until `exitControl` has executed.
    pub fn wait_for_exit(&self) {
        self.exit.wait();
    }

    /// Block until `exitControl` has executed or `timeout` elapses.
    /// Returns whether exit was requested.
    pub fn wait_for_exit_timeout(&self, timeout: Duration) -> bool {
        self.exit.wait_timeout(timeout)
    }

    /// Ordered shutdown.  Returns the service so callers can inspect the
    /// final hardware and telemetry state.
    pub fn shutdown(mut self) -> Result<NodeService<F, S>> {
        self.teardown()?
            .ok_or(Error::ThreadPanicked(CONTROLLER))
    }

    fn teardown(&mut self) -> Result<Option<NodeService<F, S>>> {
        info!("Node: shutting down");
        self.producers.cancel();

        let mut first_err = None;
        for (name, handle) in [
            (OUTER_LOOP, self.clock.take()),
            (SUBSCRIBER, self.poller.take()),
        ] {
            if let Some(handle) = handle {
                if let Err(e) = join_named(name, handle) {
                    first_err.get_or_insert(e);
                }
            }
        }

        self.queue.stop();
        let service = match self.controller.take().map(|h| join_named(CONTROLLER, h)) {
            Some(Ok(mut service)) => {
                service.tear_down();
                Some(service)
            }
            Some(Err(e)) => {
                first_err.get_or_insert(e);
                None
            }
            None => None,
        };

        match first_err {
            Some(e) => Err(e),
            None => Ok(service),
        }
    }
}

impl<F: FpgaPort + 'static, S: EventSink + 'static> Drop for Node<F, S> {
    fn drop(&mut self) {
        if self.controller.is_none() && self.clock.is_none() && self.poller.is_none() {
            return;
        }
        if let Err(e) = self.teardown() {
            warn!("Node: teardown on drop: {}", e);
        }
    }
}
