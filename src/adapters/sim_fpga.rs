//! Simulated FPGA adapter.
//!
//! Models the thermal ILC bus well enough to run the node without
//! hardware: mode-change frames update each ILC's mode, status requests
//! queue synthetic responses, and response reads drain them.  Reading more
//! words than are queued times out, as the real FIFO would.

use std::collections::VecDeque;
use std::time::Duration;

use log::{debug, info};

use crate::app::ports::FpgaPort;
use crate::config::MAX_ILCS;
use crate::error::HardwareError;
use crate::ilc::{
    FN_CHANGE_MODE, FN_REPORT_STATUS, IlcMode, MODE_WORDS, REQUEST_WORDS, StatusResponse,
};

#[derive(Debug)]
pub struct SimulatedFpga {
    initialized: bool,
    open: bool,
    modes: [IlcMode; MAX_ILCS],
    responses: VecDeque<u16>,
    cycle: u32,
}

impl Default for SimulatedFpga {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedFpga {
    pub fn new() -> Self {
        Self {
            initialized: false,
            open: false,
            modes: [IlcMode::Standby; MAX_ILCS],
            responses: VecDeque::new(),
            cycle: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn mode(&self, address: u8) -> Option<IlcMode> {
        (address as usize)
            .checked_sub(1)
            .and_then(|i| self.modes.get(i))
            .copied()
    }

    fn ensure_open(&self) -> Result<(), HardwareError> {
        if self.open {
            Ok(())
        } else {
            Err(HardwareError::NotOpen)
        }
    }

    fn slot(address: u16) -> Result<usize, HardwareError> {
        match address as usize {
            a @ 1..=MAX_ILCS => Ok(a - 1),
            _ => Err(HardwareError::FifoWrite),
        }
    }

    fn status_of(&self, address: u8) -> StatusResponse {
        let mode = self.modes[address as usize - 1];
        let enabled = mode == IlcMode::Enabled;
        // Slow sawtooth so consecutive cycles differ.
        let drift = (self.cycle % 50) as f32 / 100.0;
        StatusResponse {
            address,
            status: mode as u16,
            differential_temperature: if enabled { -0.25 + drift } else { 0.0 },
            fan_rpm: if enabled { 1200 + u16::from(address) } else { 0 },
            absolute_temperature: 20.0 + f32::from(address) / 10.0 + drift,
        }
    }
}

impl FpgaPort for SimulatedFpga {
    fn initialize(&mut self) -> Result<(), HardwareError> {
        self.initialized = true;
        Ok(())
    }

    fn open(&mut self, bitfile_dir: &str) -> Result<(), HardwareError> {
        if !self.initialized {
            return Err(HardwareError::Init("open before initialize"));
        }
        info!("SimulatedFpga: opened (bitfile dir '{}')", bitfile_dir);
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), HardwareError> {
        self.ensure_open()?;
        self.open = false;
        self.responses.clear();
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), HardwareError> {
        self.initialized = false;
        Ok(())
    }

    fn write_command_fifo(&mut self, data: &[u16], _timeout: Duration) -> Result<(), HardwareError> {
        self.ensure_open()?;
        if data.len() % MODE_WORDS != 0 {
            return Err(HardwareError::FifoWrite);
        }
        for frame in data.chunks_exact(MODE_WORDS) {
            let slot = Self::slot(frame[0])?;
            let mode = IlcMode::from_word(frame[2]).ok_or(HardwareError::FifoWrite)?;
            if frame[1] != FN_CHANGE_MODE {
                return Err(HardwareError::FifoWrite);
            }
            self.modes[slot] = mode;
        }
        debug!("SimulatedFpga: {} mode change(s)", data.len() / MODE_WORDS);
        Ok(())
    }

    fn write_request_fifo(&mut self, data: &[u16], _timeout: Duration) -> Result<(), HardwareError> {
        self.ensure_open()?;
        if data.len() % REQUEST_WORDS != 0 {
            return Err(HardwareError::FifoWrite);
        }
        self.cycle = self.cycle.wrapping_add(1);
        for frame in data.chunks_exact(REQUEST_WORDS) {
            if frame[1] != FN_REPORT_STATUS {
                return Err(HardwareError::FifoWrite);
            }
            let slot = Self::slot(frame[0])?;
            let words = self.status_of((slot + 1) as u8).to_words();
            self.responses.extend(words);
        }
        Ok(())
    }

    fn read_u16_response_fifo(
        &mut self,
        data: &mut [u16],
        _timeout: Duration,
    ) -> Result<(), HardwareError> {
        self.ensure_open()?;
        if self.responses.len() < data.len() {
            self.responses.clear();
            return Err(HardwareError::Timeout);
        }
        let n = data.len();
        for (dst, src) in data.iter_mut().zip(self.responses.drain(..n)) {
            *dst = src;
        }
        Ok(())
    }
}
