//! Port traits: the boundary between the control core and the outside world.
//!
//! ```text
//!   CommandChannel ──▶ poller ──▶ queue ──▶ NodeService ──▶ FpgaPort
//!          ▲                                    │
//!          └──────────── AckPort ◀──────────────┤
//!                                               └──▶ EventSink
//! ```
//!
//! Adapters implement these traits.  [`NodeService`](super::service::NodeService)
//! consumes them via generics, so the core never touches a real FPGA or
//! transport directly.

use std::time::Duration;

use serde_json::Value;

use super::ack::Ack;
use super::commands::CommandName;
use super::events::AppEvent;
use crate::error::HardwareError;

// ───────────────────────────────────────────────────────────────
// FPGA port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// The FPGA interface.  Only ever called from command execution.
///
/// Every FIFO operation is bounded by `timeout`; none may block forever.
pub trait FpgaPort: Send {
    /// Initialize the driver library.
    fn initialize(&mut self) -> Result<(), HardwareError>;

    /// Load the bitfile from `bitfile_dir` and open a session.
    fn open(&mut self, bitfile_dir: &str) -> Result<(), HardwareError>;

    fn close(&mut self) -> Result<(), HardwareError>;

    fn finalize(&mut self) -> Result<(), HardwareError>;

    fn write_command_fifo(&mut self, data: &[u16], timeout: Duration)
    -> Result<(), HardwareError>;

    fn write_request_fifo(&mut self, data: &[u16], timeout: Duration)
    -> Result<(), HardwareError>;

    /// Fill `data` completely from the response FIFO.
    fn read_u16_response_fifo(
        &mut self,
        data: &mut [u16],
        timeout: Duration,
    ) -> Result<(), HardwareError>;
}

// ───────────────────────────────────────────────────────────────
// Command channel (driving adapter: outside world → domain)
// ───────────────────────────────────────────────────────────────

/// A pending request on the external channel.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundRequest {
    /// Channel identifier; `<= 0` means nothing is pending.
    pub command_id: i32,
    pub params: Value,
}

/// Receives acknowledgments.  Shared between the poller (admission acks)
/// and the controller (terminal acks).
pub trait AckPort: Send + Sync {
    fn ack(&self, name: CommandName, command_id: i32, ack: &Ack);
}

/// External command transport.
pub trait CommandChannel: AckPort {
    /// Non-blocking: take the next pending request for `name`, if any.
    fn accept(&self, name: CommandName) -> Option<InboundRequest>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → telemetry / logging)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`AppEvent`]s through this port.
pub trait EventSink: Send {
    fn emit(&mut self, event: &AppEvent);
}
