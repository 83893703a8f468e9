//! thermalctl: command-queue control core for an FPGA-attached thermal
//! instrument node.
//!
//! Exposes the core for the simulation binary and for integration tests.
//! Real hardware and transports plug in through the traits in
//! [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fsm;
pub mod ilc;
pub mod node;
pub mod queue;
pub mod telemetry;
pub mod threads;

pub use error::{Error, Result};
pub use node::Node;
