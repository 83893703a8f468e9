//! Telemetry records published by the control core.
//!
//! [`EnabledIlc`] tracks which thermal ILCs are enabled and publishes only
//! when that set changed.  [`ThermalData`] collects one status response
//! per ILC during an Update cycle and publishes the lot once per cycle.

use serde::Serialize;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::config::MAX_ILCS;
use crate::ilc::StatusResponse;

/// Payload of [`AppEvent::EnabledIlc`]: addresses currently enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnabledIlcData {
    pub enabled: heapless::Vec<u8, MAX_ILCS>,
}

/// Per-address enable flags with a dirty marker.
#[derive(Debug, Clone)]
pub struct EnabledIlc {
    flags: [bool; MAX_ILCS],
    updated: bool,
}

impl Default for EnabledIlc {
    fn default() -> Self {
        Self::new()
    }
}

impl EnabledIlc {
    pub fn new() -> Self {
        Self {
            flags: [false; MAX_ILCS],
            updated: false,
        }
    }

    /// Set one address.  Out-of-range addresses are ignored.
    pub fn set(&mut self, address: u8, enabled: bool) {
        let Some(slot) = (address as usize)
            .checked_sub(1)
            .and_then(|i| self.flags.get_mut(i))
        else {
            return;
        };
        if *slot != enabled {
            *slot = enabled;
            self.updated = true;
        }
    }

    pub fn set_all(&mut self, addresses: &[u8], enabled: bool) {
        for &address in addresses {
            self.set(address, enabled);
        }
    }

    pub fn is_enabled(&self, address: u8) -> bool {
        (address as usize)
            .checked_sub(1)
            .and_then(|i| self.flags.get(i))
            .copied()
            .unwrap_or(false)
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }

    pub fn snapshot(&self) -> EnabledIlcData {
        let mut enabled = heapless::Vec::new();
        for (i, _) in self.flags.iter().enumerate().filter(|(_, on)| **on) {
            // At most MAX_ILCS entries, cannot overflow.
            let _ = enabled.push((i + 1) as u8);
        }
        EnabledIlcData { enabled }
    }

    /// Emit one event if anything changed since the last send.
    pub fn send(&mut self, sink: &mut impl EventSink) -> bool {
        if !self.updated {
            return false;
        }
        sink.emit(&AppEvent::EnabledIlc(self.snapshot()));
        self.updated = false;
        true
    }
}

/// Payload of [`AppEvent::ThermalData`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThermalSnapshot {
    pub records: heapless::Vec<StatusResponse, MAX_ILCS>,
}

/// Latest thermal status per ILC.
#[derive(Debug, Clone, Default)]
pub struct ThermalData {
    records: heapless::Vec<StatusResponse, MAX_ILCS>,
}

impl ThermalData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `response.address`.
    pub fn record(&mut self, response: StatusResponse) {
        if let Some(existing) = self
            .records
            .iter_mut()
            .find(|r| r.address == response.address)
        {
            *existing = response;
        } else if self.records.push(response).is_err() {
            log::warn!("ThermalData: table full, dropping ILC {}", response.address);
        }
    }

    pub fn get(&self, address: u8) -> Option<&StatusResponse> {
        self.records.iter().find(|r| r.address == address)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn send(&self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::ThermalData(ThermalSnapshot {
            records: self.records.clone(),
        }));
    }
}
