//! Application core: commands, acknowledgments, events, ports and the
//! service that executes commands.
//!
//! All interaction with hardware and transports happens through the
//! **port traits** defined in [`ports`], keeping this layer testable
//! without an FPGA.

pub mod ack;
pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
