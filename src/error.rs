//! Unified error types for the thermal controller core.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! bootstrap layer's handling uniform.  The leaf enums double as the
//! source of failed-acknowledgment codes: admission errors map to `1xx`,
//! execution errors to `2xx`.

use core::fmt;

use crate::app::commands::CommandName;
use crate::config::ConfigError;
use crate::fsm::SummaryState;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The FPGA interface failed.
    Hardware(HardwareError),
    /// An inbound request was rejected before reaching the queue.
    Admission(AdmissionError),
    /// A queued command failed while executing.
    Execution(ExecutionError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// A worker thread could not be spawned.
    Spawn(&'static str),
    /// A worker thread terminated by panicking.
    ThreadPanicked(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware(e) => write!(f, "hardware: {e}"),
            Self::Admission(e) => write!(f, "admission: {e}"),
            Self::Execution(e) => write!(f, "execution: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Spawn(name) => write!(f, "failed to spawn thread {name}"),
            Self::ThreadPanicked(name) => write!(f, "thread {name} panicked"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Hardware errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareError {
    /// The FPGA session is not open.
    NotOpen,
    /// A FIFO operation did not complete within its timeout.
    Timeout,
    /// Writing the command or request FIFO failed.
    FifoWrite,
    /// Reading the response FIFO failed.
    FifoRead,
    /// An ILC response did not match the request it answers.
    BadResponse,
    /// A frame would exceed the FIFO buffer capacity.
    FrameOverflow,
    /// Initialization or bitfile load failed.
    Init(&'static str),
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotOpen => write!(f, "FPGA not open"),
            Self::Timeout => write!(f, "FIFO timeout"),
            Self::FifoWrite => write!(f, "FIFO write failed"),
            Self::FifoRead => write!(f, "FIFO read failed"),
            Self::BadResponse => write!(f, "unexpected ILC response"),
            Self::FrameOverflow => write!(f, "frame exceeds FIFO buffer"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for HardwareError {}

impl From<HardwareError> for Error {
    fn from(e: HardwareError) -> Self {
        Self::Hardware(e)
    }
}

// ---------------------------------------------------------------------------
// Admission errors
// ---------------------------------------------------------------------------

/// Rejections raised before a command may occupy a queue slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// The command name is not part of the registry.
    UnknownCommand(String),
    /// The request parameters could not be decoded.
    Decode(String),
    /// `start` was requested without a settings selection.
    MissingSettings,
}

impl AdmissionError {
    /// Domain code carried in the failed acknowledgment.
    pub fn code(&self) -> i32 {
        match self {
            Self::UnknownCommand(_) => 101,
            Self::Decode(_) => 102,
            Self::MissingSettings => 103,
        }
    }
}

impl fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand(name) => write!(f, "unknown command '{name}'"),
            Self::Decode(msg) => write!(f, "cannot decode parameters: {msg}"),
            Self::MissingSettings => write!(f, "settingsToApply must not be empty"),
        }
    }
}

impl std::error::Error for AdmissionError {}

impl From<AdmissionError> for Error {
    fn from(e: AdmissionError) -> Self {
        Self::Admission(e)
    }
}

// ---------------------------------------------------------------------------
// Execution errors
// ---------------------------------------------------------------------------

/// Failures detected while a command runs on the controller thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionError {
    /// Hardware I/O failed mid-command.
    Hardware(HardwareError),
    /// The command is not accepted in the state current at execution time.
    NotAllowed {
        command: CommandName,
        state: SummaryState,
    },
    /// The command was dropped before it produced a result.
    Abandoned,
    /// Execution panicked; the controller isolated it.
    Panicked,
}

impl ExecutionError {
    /// Domain code carried in the failed acknowledgment.
    pub fn code(&self) -> i32 {
        match self {
            Self::Hardware(_) => 201,
            Self::NotAllowed { .. } => 202,
            Self::Abandoned => 203,
            Self::Panicked => 204,
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware(e) => write!(f, "hardware: {e}"),
            Self::NotAllowed { command, state } => {
                write!(f, "{command} not allowed in {state} state")
            }
            Self::Abandoned => write!(f, "command abandoned before completion"),
            Self::Panicked => write!(f, "command panicked during execution"),
        }
    }
}

impl std::error::Error for ExecutionError {}

impl From<HardwareError> for ExecutionError {
    fn from(e: HardwareError) -> Self {
        Self::Hardware(e)
    }
}

impl From<ExecutionError> for Error {
    fn from(e: ExecutionError) -> Self {
        Self::Execution(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
