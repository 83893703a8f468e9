//! Thermal ILC framing.
//!
//! Minimal word-level frames exchanged with the thermal ILCs through the
//! FPGA FIFOs.  Only what the control cycle needs:
//!
//! ```text
//! command FIFO   [address, 65, mode]                      per ILC, batched
//! request FIFO   [address, 88]                            per ILC, batched
//! response FIFO  [address, status, Δt·100, fan rpm, t·100] per ILC
//! ```
//!
//! Temperatures travel as signed hundredths of a degree Celsius.

use serde::Serialize;

use crate::config::MAX_ILCS;
use crate::error::HardwareError;

/// Function code: change ILC operating mode.
pub const FN_CHANGE_MODE: u16 = 65;
/// Function code: report thermal status.
pub const FN_REPORT_STATUS: u16 = 88;

/// Words per ILC in a mode-change frame.
pub const MODE_WORDS: usize = 3;
/// Words per ILC in a status request.
pub const REQUEST_WORDS: usize = 2;
/// Words per ILC in a status response.
pub const RESPONSE_WORDS: usize = 5;

pub type ModeFrame = heapless::Vec<u16, { MODE_WORDS * MAX_ILCS }>;
pub type RequestFrame = heapless::Vec<u16, { REQUEST_WORDS * MAX_ILCS }>;

/// ILC operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u16)]
pub enum IlcMode {
    Standby = 0,
    Disabled = 1,
    Enabled = 2,
}

impl IlcMode {
    pub fn from_word(word: u16) -> Option<Self> {
        match word {
            0 => Some(Self::Standby),
            1 => Some(Self::Disabled),
            2 => Some(Self::Enabled),
            _ => None,
        }
    }
}

/// Build one batched mode-change frame for `addresses`.
pub fn mode_frame(addresses: &[u8], mode: IlcMode) -> Result<ModeFrame, HardwareError> {
    let mut frame = ModeFrame::new();
    for &address in addresses {
        frame
            .extend_from_slice(&[u16::from(address), FN_CHANGE_MODE, mode as u16])
            .map_err(|_| HardwareError::FrameOverflow)?;
    }
    Ok(frame)
}

/// Build one batched status request for `addresses`.
pub fn status_request(addresses: &[u8]) -> Result<RequestFrame, HardwareError> {
    let mut frame = RequestFrame::new();
    for &address in addresses {
        frame
            .extend_from_slice(&[u16::from(address), FN_REPORT_STATUS])
            .map_err(|_| HardwareError::FrameOverflow)?;
    }
    Ok(frame)
}

/// One ILC's answer to a status request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusResponse {
    pub address: u8,
    pub status: u16,
    /// Differential temperature, °C.
    pub differential_temperature: f32,
    pub fan_rpm: u16,
    /// Absolute temperature, °C.
    pub absolute_temperature: f32,
}

impl StatusResponse {
    /// Parse one response.  `words` must hold exactly [`RESPONSE_WORDS`].
    pub fn parse(words: &[u16]) -> Result<Self, HardwareError> {
        let &[address, status, diff, fan_rpm, abs] = words else {
            return Err(HardwareError::BadResponse);
        };
        let address = u8::try_from(address).map_err(|_| HardwareError::BadResponse)?;
        Ok(Self {
            address,
            status,
            differential_temperature: centi_to_celsius(diff),
            fan_rpm,
            absolute_temperature: centi_to_celsius(abs),
        })
    }

    /// Encode back to words (used by the simulated FPGA).
    pub fn to_words(&self) -> [u16; RESPONSE_WORDS] {
        [
            u16::from(self.address),
            self.status,
            celsius_to_centi(self.differential_temperature),
            self.fan_rpm,
            celsius_to_centi(self.absolute_temperature),
        ]
    }
}

fn centi_to_celsius(word: u16) -> f32 {
    f32::from(word as i16) / 100.0
}

fn celsius_to_centi(celsius: f32) -> u16 {
    ((celsius * 100.0).round().clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16) as u16
}
