//! Node configuration parameters
//!
//! All tunable parameters for the thermal controller core.
//! Values come from [`NodeConfig::default`] or a JSON file given at boot.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Highest thermal ILC address on the device bus.
pub const MAX_ILCS: usize = 96;

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    // --- Timing ---
    /// Outer loop (Update tick) period in milliseconds
    pub outer_loop_period_ms: u64,
    /// External command poll interval in microseconds
    pub poll_interval_us: u64,

    // --- FPGA ---
    /// Directory holding the FPGA bitfile
    pub bitfile_dir: String,
    /// Timeout for command/request FIFO writes (milliseconds)
    pub fifo_timeout_ms: u64,
    /// Timeout for response FIFO reads (milliseconds)
    pub response_timeout_ms: u64,

    // --- Device bus ---
    /// Addresses of the thermal ILCs serviced by this node (1-96)
    pub ilc_addresses: heapless::Vec<u8, MAX_ILCS>,

    // --- Diagnostics ---
    /// Queue depth at which a backlog warning is logged
    pub backlog_warn_depth: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Timing
            outer_loop_period_ms: 20, // 50 Hz
            poll_interval_us: 100,

            // FPGA
            bitfile_dir: String::from("."),
            fifo_timeout_ms: 50,
            response_timeout_ms: 10,

            // Device bus: every ILC
            ilc_addresses: (1..=MAX_ILCS as u8).collect(),

            // Diagnostics
            backlog_warn_depth: 50,
        }
    }
}

impl NodeConfig {
    /// Load and validate configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound,
            _ => ConfigError::IoError,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            log::warn!("config {}: {}", path.display(), e);
            ConfigError::Corrupted
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the control loop unsafe or inert.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.outer_loop_period_ms == 0 {
            return Err(ConfigError::ValidationFailed("outer_loop_period_ms must be > 0"));
        }
        if self.poll_interval_us == 0 {
            return Err(ConfigError::ValidationFailed("poll_interval_us must be > 0"));
        }
        if self.fifo_timeout_ms == 0 || self.response_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("FIFO timeouts must be bounded and > 0"));
        }
        if self.ilc_addresses.is_empty() {
            return Err(ConfigError::ValidationFailed("ilc_addresses must not be empty"));
        }
        let mut seen = [false; MAX_ILCS];
        for &address in &self.ilc_addresses {
            if address == 0 || address as usize > MAX_ILCS {
                return Err(ConfigError::ValidationFailed("ILC address out of range 1-96"));
            }
            if seen[address as usize - 1] {
                return Err(ConfigError::ValidationFailed("duplicate ILC address"));
            }
            seen[address as usize - 1] = true;
        }
        Ok(())
    }

    pub fn outer_loop_period(&self) -> Duration {
        Duration::from_millis(self.outer_loop_period_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }

    pub fn fifo_timeout(&self) -> Duration {
        Duration::from_millis(self.fifo_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

/// Errors from loading or validating a [`NodeConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The config file does not exist.
    NotFound,
    /// The file is not valid JSON for [`NodeConfig`].
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error reading the file.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
