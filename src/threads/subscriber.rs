//! External command poller.
//!
//! Polls the [`CommandChannel`] for every registered command name at a
//! short fixed interval.  Each pending request is decoded, validated and
//! either enqueued (with an in-progress ack) or rejected on the spot with a
//! failed ack.  `setLogLevel` never reaches the queue.

use std::sync::Arc;
use std::time::Duration;

use log::{LevelFilter, debug, info, warn};

use super::StopToken;
use crate::app::ack::AckHandle;
use crate::app::commands::{Command, CommandName, Request};
use crate::app::events::AppEvent;
use crate::app::ports::{AckPort, CommandChannel, EventSink, InboundRequest};
use crate::queue::CommandQueue;

/// Map an external verbosity code onto a `log` filter and the level
/// reported back.
pub fn log_level_from_code(level: i32) -> (LevelFilter, u8) {
    match level {
        l if l >= 40 => (LevelFilter::Error, 40),
        l if l >= 30 => (LevelFilter::Warn, 30),
        l if l >= 20 => (LevelFilter::Info, 20),
        l if l >= 10 => (LevelFilter::Debug, 10),
        _ => (LevelFilter::Trace, 0),
    }
}

pub struct CommandPoller<C: CommandChannel, S: EventSink> {
    channel: Arc<C>,
    queue: Arc<CommandQueue>,
    sink: S,
    registry: Vec<CommandName>,
}

impl<C: CommandChannel + 'static, S: EventSink> CommandPoller<C, S> {
    pub fn new(channel: Arc<C>, queue: Arc<CommandQueue>, sink: S) -> Self {
        Self {
            channel,
            queue,
            sink,
            registry: CommandName::ALL.to_vec(),
        }
    }

    pub fn registry(&self) -> &[CommandName] {
        &self.registry
    }

    /// One pass over the registry.  Returns the number of requests handled.
    pub fn try_commands(&mut self) -> usize {
        let mut handled = 0;
        for i in 0..self.registry.len() {
            let name = self.registry[i];
            while let Some(request) = self.channel.accept(name) {
                if request.command_id <= 0 {
                    break;
                }
                self.handle(name, request);
                handled += 1;
            }
        }
        handled
    }

    fn handle(&mut self, name: CommandName, request: InboundRequest) {
        let port: Arc<dyn AckPort> = self.channel.clone();
        let ack = AckHandle::new(port, name, request.command_id);

        let decoded = match Request::decode(name, &request.params) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Poller: {} #{} rejected: {}", name, request.command_id, e);
                ack.fail(e.code(), e.to_string());
                return;
            }
        };

        match decoded {
            Request::SetLogLevel { level } => {
                let (filter, reported) = log_level_from_code(level);
                log::set_max_level(filter);
                info!("Poller: log level set to {} ({})", reported, filter);
                ack.complete();
                self.sink.emit(&AppEvent::LogLevel(reported));
            }
            Request::Command(kind) => match Command::new(kind, ack).admit() {
                Ok(cmd) => {
                    debug!("Poller: {} #{} queued", name, request.command_id);
                    // Sent before enqueue so it always precedes the terminal ack.
                    cmd.in_progress();
                    self.queue.enqueue(cmd);
                }
                Err(rejected) => {
                    let e = rejected.acknowledge();
                    warn!("Poller: {} #{} rejected: {}", name, request.command_id, e);
                }
            },
        }
    }

    /// Poll every `interval` until `stop` is raised.
    pub fn run(mut self, interval: Duration, stop: &StopToken) {
        info!(
            "Poller: running, {} commands every {:?}",
            self.registry.len(),
            interval
        );
        loop {
            self.try_commands();
            if stop.wait_timeout(interval) {
                break;
            }
        }
        info!("Poller: stopped");
    }
}
