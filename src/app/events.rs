//! Outbound application events.
//!
//! [`NodeService`](super::service::NodeService) and the command poller emit
//! these through the [`EventSink`](super::ports::EventSink) port.  Adapters
//! decide what to do with them: log, publish, record in tests.

use serde::Serialize;

use crate::fsm::SummaryState;
use crate::telemetry::{EnabledIlcData, ThermalSnapshot};

/// Structured events emitted by the control core.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AppEvent {
    /// The FPGA is up; carries the initial summary state.
    Started(#[serde(serialize_with = "state_name")] SummaryState),

    /// The summary state changed.
    SummaryStateChanged {
        #[serde(serialize_with = "state_name")]
        from: SummaryState,
        #[serde(serialize_with = "state_name")]
        to: SummaryState,
    },

    /// The set of enabled thermal ILCs changed.
    EnabledIlc(EnabledIlcData),

    /// One outer-loop cycle's thermal readings.
    ThermalData(ThermalSnapshot),

    /// Log verbosity was changed; carries the reported level.
    LogLevel(u8),

    /// `exitControl` executed; the process should shut down.
    ExitRequested,
}

fn state_name<S: serde::Serializer>(state: &SummaryState, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(state.name())
}
