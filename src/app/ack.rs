//! Command acknowledgments.
//!
//! Every accepted external command gets exactly one terminal ack.  The
//! [`AckHandle`] enforces that: `complete` and `fail` consume it, and a
//! handle dropped without either (unwinding panic, hard shutdown) reports
//! failure on its own.

use std::sync::Arc;

use log::{debug, warn};

use super::commands::CommandName;
use super::ports::AckPort;
use crate::error::ExecutionError;

/// Wire code for an in-progress ack.
pub const ACK_IN_PROGRESS: i32 = 301;
/// Wire code for a complete ack.
pub const ACK_COMPLETE: i32 = 303;
/// Wire code for a failed ack.
pub const ACK_FAILED: i32 = -302;

/// Acknowledgment sent back to a command's originator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    InProgress,
    Complete,
    /// `code` is the domain error code (`1xx` admission, `2xx` execution).
    Failed { code: i32, message: String },
}

impl Ack {
    /// Wire code of the ack itself.
    pub fn code(&self) -> i32 {
        match self {
            Self::InProgress => ACK_IN_PROGRESS,
            Self::Complete => ACK_COMPLETE,
            Self::Failed { .. } => ACK_FAILED,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

struct Route {
    port: Arc<dyn AckPort>,
    name: CommandName,
    command_id: i32,
}

/// Move-only ack obligation for one command.
///
/// Detached handles (internal commands, direct submissions) have no
/// originator; their acks are only logged.
pub struct AckHandle {
    route: Option<Route>,
    label: &'static str,
    done: bool,
}

impl AckHandle {
    pub fn new(port: Arc<dyn AckPort>, name: CommandName, command_id: i32) -> Self {
        Self {
            route: Some(Route {
                port,
                name,
                command_id,
            }),
            label: name.as_str(),
            done: false,
        }
    }

    pub fn detached(label: &'static str) -> Self {
        Self {
            route: None,
            label,
            done: false,
        }
    }

    /// External identifier, if the command came from the channel.
    pub fn command_id(&self) -> Option<i32> {
        self.route.as_ref().map(|r| r.command_id)
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn in_progress(&self) {
        self.send(&Ack::InProgress);
    }

    pub fn complete(mut self) {
        self.finish(&Ack::Complete);
    }

    pub fn fail(mut self, code: i32, message: impl Into<String>) {
        let ack = Ack::Failed {
            code,
            message: message.into(),
        };
        self.finish(&ack);
    }

    pub fn fail_with(self, error: &ExecutionError) {
        self.fail(error.code(), error.to_string());
    }

    fn finish(&mut self, ack: &Ack) {
        self.done = true;
        self.send(ack);
    }

    fn send(&self, ack: &Ack) {
        match &self.route {
            Some(route) => route.port.ack(route.name, route.command_id, ack),
            None => debug!("ack {} (detached): {:?}", self.label, ack),
        }
    }
}

impl Drop for AckHandle {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let error = if std::thread::panicking() {
            ExecutionError::Panicked
        } else {
            ExecutionError::Abandoned
        };
        warn!("{}: no terminal ack sent, failing with {}", self.label, error);
        self.finish(&Ack::Failed {
            code: error.code(),
            message: error.to_string(),
        });
    }
}

impl core::fmt::Debug for AckHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AckHandle")
            .field("label", &self.label)
            .field("command_id", &self.command_id())
            .field("done", &self.done)
            .finish()
    }
}
