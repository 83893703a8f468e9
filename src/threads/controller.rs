//! Controller thread: the queue's only consumer.
//!
//! Pops commands in FIFO order and executes each one to completion before
//! taking the next.  A panicking command is isolated: the unwind drops its
//! ack handle (which reports failure), the panic is logged and counted, and
//! the loop carries on.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use log::{error, info, warn};

use crate::app::commands::AdmittedCommand;
use crate::app::ports::{EventSink, FpgaPort};
use crate::app::service::NodeService;
use crate::diagnostics::ControllerMetrics;
use crate::queue::CommandQueue;

pub struct ControllerThread<F: FpgaPort, S: EventSink> {
    queue: Arc<CommandQueue>,
    service: NodeService<F, S>,
    metrics: Arc<ControllerMetrics>,
}

impl<F: FpgaPort, S: EventSink> ControllerThread<F, S> {
    pub fn new(
        queue: Arc<CommandQueue>,
        service: NodeService<F, S>,
        metrics: Arc<ControllerMetrics>,
    ) -> Self {
        Self {
            queue,
            service,
            metrics,
        }
    }

    /// Run until the queue is stopped, then hand the service back.
    pub fn run(mut self) -> NodeService<F, S> {
        info!("ControllerThread: running");
        while let Some(cmd) = self.queue.dequeue() {
            self.execute_one(cmd);
        }

        let leftovers = self.queue.drain();
        if !leftovers.is_empty() {
            error!(
                "ControllerThread: hard shutdown with {} command(s) still queued",
                leftovers.len()
            );
            self.metrics.record_abandoned(leftovers.len());
            for cmd in leftovers {
                warn!("ControllerThread: abandoning {}", cmd.kind().label());
                drop(cmd);
            }
        }
        info!("ControllerThread: stopped");
        self.service
    }

    /// Execute one command with panic isolation.
    pub fn execute_one(&mut self, cmd: AdmittedCommand) {
        let label = cmd.kind().label();
        let service = &mut self.service;

        self.metrics.begin();
        let outcome = catch_unwind(AssertUnwindSafe(|| service.execute(cmd)));
        self.metrics.end();

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.metrics.record_failure();
                warn!("ControllerThread: {} failed: {}", label, e);
            }
            Err(payload) => {
                self.metrics.record_panic();
                self.metrics.record_failure();
                error!(
                    "ControllerThread: {} panicked: {}",
                    label,
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    pub fn service(&self) -> &NodeService<F, S> {
        &self.service
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}
