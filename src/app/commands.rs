//! Commands accepted by the node.
//!
//! The command set is closed: [`CommandName`] enumerates every name the
//! external channel may carry, and [`CommandKind`] every unit of work the
//! controller executes.  A [`Command`] pairs a kind with its
//! [`AckHandle`]; only an [`AdmittedCommand`] (one that passed
//! validation) can enter the queue.

use core::fmt;

use serde::Deserialize;
use serde_json::Value;

use super::ack::AckHandle;
use crate::error::AdmissionError;

// ───────────────────────────────────────────────────────────────
// Names
// ───────────────────────────────────────────────────────────────

/// Every command name accepted on the external channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    Start,
    Enable,
    Disable,
    Standby,
    ExitControl,
    SetLogLevel,
}

impl CommandName {
    pub const ALL: [CommandName; 6] = [
        Self::Start,
        Self::Enable,
        Self::Disable,
        Self::Standby,
        Self::ExitControl,
        Self::SetLogLevel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Standby => "standby",
            Self::ExitControl => "exitControl",
            Self::SetLogLevel => "setLogLevel",
        }
    }

    pub fn parse(name: &str) -> Result<Self, AdmissionError> {
        Self::ALL
            .into_iter()
            .find(|n| n.as_str() == name)
            .ok_or_else(|| AdmissionError::UnknownCommand(name.to_owned()))
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ───────────────────────────────────────────────────────────────
// Kinds and requests
// ───────────────────────────────────────────────────────────────

/// Work executed by the controller thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Start { settings_to_apply: String },
    Enable,
    Disable,
    Standby,
    ExitControl,
    /// One outer-loop cycle; produced internally by the clock.
    Update,
}

impl CommandKind {
    /// External name, `None` for internal commands.
    pub fn command_name(&self) -> Option<CommandName> {
        match self {
            Self::Start { .. } => Some(CommandName::Start),
            Self::Enable => Some(CommandName::Enable),
            Self::Disable => Some(CommandName::Disable),
            Self::Standby => Some(CommandName::Standby),
            Self::ExitControl => Some(CommandName::ExitControl),
            Self::Update => None,
        }
    }

    pub fn label(&self) -> &'static str {
        self.command_name().map_or("update", CommandName::as_str)
    }

    /// Parameter check.  State compatibility is judged at execution.
    pub fn validate(&self) -> Result<(), AdmissionError> {
        match self {
            Self::Start { settings_to_apply } if settings_to_apply.trim().is_empty() => {
                Err(AdmissionError::MissingSettings)
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartParams {
    settings_to_apply: String,
}

#[derive(Debug, Deserialize)]
struct SetLogLevelParams {
    level: i32,
}

/// A decoded inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Goes through admission and the queue.
    Command(CommandKind),
    /// Handled inline by the poller.
    SetLogLevel { level: i32 },
}

impl Request {
    /// Decode the JSON parameters of a request named `name`.
    pub fn decode(name: CommandName, params: &Value) -> Result<Self, AdmissionError> {
        let request = match name {
            CommandName::Start => {
                let p: StartParams = decode_params(params)?;
                Self::Command(CommandKind::Start {
                    settings_to_apply: p.settings_to_apply,
                })
            }
            CommandName::SetLogLevel => {
                let p: SetLogLevelParams = decode_params(params)?;
                Self::SetLogLevel { level: p.level }
            }
            CommandName::Enable => no_params(params, CommandKind::Enable)?,
            CommandName::Disable => no_params(params, CommandKind::Disable)?,
            CommandName::Standby => no_params(params, CommandKind::Standby)?,
            CommandName::ExitControl => no_params(params, CommandKind::ExitControl)?,
        };
        Ok(request)
    }
}

fn decode_params<'de, T: Deserialize<'de>>(params: &'de Value) -> Result<T, AdmissionError> {
    T::deserialize(params).map_err(|e| AdmissionError::Decode(e.to_string()))
}

fn no_params(params: &Value, kind: CommandKind) -> Result<Request, AdmissionError> {
    match params {
        Value::Null | Value::Object(_) => Ok(Request::Command(kind)),
        other => Err(AdmissionError::Decode(format!(
            "expected an object or null, got {other}"
        ))),
    }
}

// ───────────────────────────────────────────────────────────────
// Admission
// ───────────────────────────────────────────────────────────────

/// A command before admission.
#[derive(Debug)]
pub struct Command {
    kind: CommandKind,
    ack: AckHandle,
}

impl Command {
    pub fn new(kind: CommandKind, ack: AckHandle) -> Self {
        Self { kind, ack }
    }

    /// A command without an external originator.
    pub fn detached(kind: CommandKind) -> Self {
        let ack = AckHandle::detached(kind.label());
        Self { kind, ack }
    }

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    /// Validate and, on success, produce the only value the queue accepts.
    pub fn admit(self) -> Result<AdmittedCommand, Rejected> {
        match self.kind.validate() {
            Ok(()) => Ok(AdmittedCommand {
                kind: self.kind,
                ack: self.ack,
            }),
            Err(error) => Err(Rejected {
                error,
                ack: self.ack,
            }),
        }
    }
}

/// A validated command.  Only [`Command::admit`] creates one.
#[derive(Debug)]
pub struct AdmittedCommand {
    kind: CommandKind,
    ack: AckHandle,
}

impl AdmittedCommand {
    /// The clock's periodic cycle; parameterless, so always admissible.
    pub fn update() -> Self {
        Self {
            kind: CommandKind::Update,
            ack: AckHandle::detached("update"),
        }
    }

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    pub fn command_id(&self) -> Option<i32> {
        self.ack.command_id()
    }

    pub fn in_progress(&self) {
        self.ack.in_progress();
    }

    pub fn into_parts(self) -> (CommandKind, AckHandle) {
        (self.kind, self.ack)
    }
}

/// A command that failed validation.
#[derive(Debug)]
pub struct Rejected {
    error: AdmissionError,
    ack: AckHandle,
}

impl Rejected {
    pub fn error(&self) -> &AdmissionError {
        &self.error
    }

    /// Send the failed ack and hand back the reason.
    pub fn acknowledge(self) -> AdmissionError {
        self.ack.fail(self.error.code(), self.error.to_string());
        self.error
    }
}
