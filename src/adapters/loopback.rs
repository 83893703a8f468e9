//! In-process command channel.
//!
//! Stands in for the external command transport: callers [`submit`] named
//! requests with JSON parameters and read back the acknowledgments the
//! node sends.  Used by the simulation binary and by tests.
//!
//! The binary also feeds it from stdin, one JSON request per line:
//!
//! ```text
//! {"name": "start", "params": {"settingsToApply": "Default"}}
//! {"name": "exitControl"}
//! ```
//!
//! [`submit`]: LoopbackChannel::submit

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::Deserialize;
use serde_json::Value;

use crate::app::ack::Ack;
use crate::app::commands::CommandName;
use crate::app::ports::{AckPort, CommandChannel, InboundRequest};
use crate::error::AdmissionError;

/// One line of line-delimited request input.
#[derive(Debug, Deserialize)]
struct RequestLine {
    name: String,
    #[serde(default)]
    params: Value,
}

/// One acknowledgment as received by the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckRecord {
    pub name: CommandName,
    pub command_id: i32,
    pub ack: Ack,
}

#[derive(Debug, Default)]
struct Inner {
    pending: HashMap<CommandName, VecDeque<InboundRequest>>,
    next_id: i32,
    acks: Vec<AckRecord>,
}

#[derive(Debug, Default)]
pub struct LoopbackChannel {
    inner: Mutex<Inner>,
    acked: Condvar,
}

impl LoopbackChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request and return the identifier it was assigned.
    pub fn submit(&self, name: CommandName, params: Value) -> i32 {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let command_id = inner.next_id;
        inner
            .pending
            .entry(name)
            .or_default()
            .push_back(InboundRequest { command_id, params });
        command_id
    }

    /// Parse one JSON request line and submit it.  Returns the assigned
    /// identifier and the command name.
    pub fn submit_line(&self, line: &str) -> Result<(i32, CommandName), AdmissionError> {
        let request: RequestLine =
            serde_json::from_str(line).map_err(|e| AdmissionError::Decode(e.to_string()))?;
        let name = CommandName::parse(&request.name)?;
        Ok((self.submit(name, request.params), name))
    }

    /// Requests not yet picked up by the poller.
    pub fn pending(&self) -> usize {
        self.inner.lock().pending.values().map(VecDeque::len).sum()
    }

    /// Every ack received so far, in arrival order.
    pub fn acks(&self) -> Vec<AckRecord> {
        self.inner.lock().acks.clone()
    }

    /// Acks received for one request, in arrival order.
    pub fn acks_for(&self, command_id: i32) -> Vec<Ack> {
        self.inner
            .lock()
            .acks
            .iter()
            .filter(|r| r.command_id == command_id)
            .map(|r| r.ack.clone())
            .collect()
    }

    /// Block until `command_id` has a terminal ack, up to `timeout`.
    pub fn wait_terminal(&self, command_id: i32, timeout: Duration) -> Option<Ack> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            let terminal = inner
                .acks
                .iter()
                .find(|r| r.command_id == command_id && r.ack.is_terminal())
                .map(|r| r.ack.clone());
            if terminal.is_some() {
                return terminal;
            }
            if self.acked.wait_until(&mut inner, deadline).timed_out() {
                return None;
            }
        }
    }
}

impl AckPort for LoopbackChannel {
    fn ack(&self, name: CommandName, command_id: i32, ack: &Ack) {
        self.inner.lock().acks.push(AckRecord {
            name,
            command_id,
            ack: ack.clone(),
        });
        self.acked.notify_all();
    }
}

impl CommandChannel for LoopbackChannel {
    fn accept(&self, name: CommandName) -> Option<InboundRequest> {
        self.inner
            .lock()
            .pending
            .get_mut(&name)
            .and_then(VecDeque::pop_front)
    }
}
