//! Summary-state machine: the node's life-cycle state.
//!
//! Table-driven, like a classic embedded FSM:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  STATE_TABLE                                             │
//! │  ┌──────────┬──────────┬───────────────────────────────┐ │
//! │  │ state    │ ILC mode │ accepts                       │ │
//! │  ├──────────┼──────────┼───────────────────────────────┤ │
//! │  │ Standby  │ Standby  │ start, exitControl            │ │
//! │  │ Disabled │ Disabled │ enable, standby               │ │
//! │  │ Enabled  │ Enabled  │ disable                       │ │
//! │  │ Fault    │ Disabled │ standby                       │ │
//! │  └──────────┴──────────┴───────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The state lives in a single atomic.  [`SummaryStateCell`] is the one
//! writer and is owned by the controller's service; producers hold
//! [`SummaryStateReader`] clones and can poll [`SummaryStateReader::is_active`]
//! every tick without locking or going through the queue.

pub mod states;

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all life-cycle states.
/// Must stay in sync with [`states::STATE_TABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SummaryState {
    Standby = 0,
    Disabled = 1,
    Enabled = 2,
    Fault = 3,
}

impl SummaryState {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 4;

    pub const ALL: [SummaryState; Self::COUNT] =
        [Self::Standby, Self::Disabled, Self::Enabled, Self::Fault];

    /// Convert a stored index back to a state.  Out-of-range values map to
    /// `Fault`, which stops periodic work.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Standby,
            1 => Self::Disabled,
            2 => Self::Enabled,
            3 => Self::Fault,
            _ => {
                debug_assert!(false, "invalid summary state index: {idx}");
                Self::Fault
            }
        }
    }

    /// Periodic Update commands are produced only while active.
    pub fn is_active(self) -> bool {
        self == Self::Enabled
    }

    pub fn name(self) -> &'static str {
        states::descriptor(self).name
    }
}

impl fmt::Display for SummaryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Shared storage
// ---------------------------------------------------------------------------

/// The single writable handle to the summary state.
///
/// Deliberately not `Clone`: whoever owns the cell is the only writer.
#[derive(Debug)]
pub struct SummaryStateCell {
    value: Arc<AtomicU8>,
}

impl SummaryStateCell {
    pub fn new(initial: SummaryState) -> Self {
        Self {
            value: Arc::new(AtomicU8::new(initial as u8)),
        }
    }

    pub fn get(&self) -> SummaryState {
        SummaryState::from_index(self.value.load(Ordering::Acquire) as usize)
    }

    /// Store a new state, returning the previous one.
    pub fn set(&mut self, next: SummaryState) -> SummaryState {
        let prev = SummaryState::from_index(self.value.swap(next as u8, Ordering::AcqRel) as usize);
        if prev != next {
            info!("SummaryState: {} -> {}", prev, next);
        }
        prev
    }

    /// A read-only handle for producer threads.
    pub fn reader(&self) -> SummaryStateReader {
        SummaryStateReader {
            value: Arc::clone(&self.value),
        }
    }
}

/// Lock-free, read-only view of the summary state.
#[derive(Debug, Clone)]
pub struct SummaryStateReader {
    value: Arc<AtomicU8>,
}

impl SummaryStateReader {
    pub fn get(&self) -> SummaryState {
        SummaryState::from_index(self.value.load(Ordering::Acquire) as usize)
    }

    pub fn is_active(&self) -> bool {
        self.get().is_active()
    }
}
