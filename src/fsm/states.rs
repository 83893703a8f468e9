//! State table: which commands each summary state accepts.
//!
//! ```text
//!  STANDBY ──[start]──▶ DISABLED ──[enable]──▶ ENABLED
//!     ▲                   │  ▲                   │
//!     └─────[standby]─────┘  └─────[disable]─────┘
//!     ▲
//!     └─────[standby]───── FAULT ◀──[update I/O error]── ENABLED
//!
//!  STANDBY ──[exitControl]──▶ (process shutdown, state unchanged)
//! ```
//!
//! `update` is accepted everywhere and is a no-op outside `Enabled`;
//! `setLogLevel` never reaches the queue.

use super::SummaryState;
use crate::app::commands::CommandName;
use crate::ilc::IlcMode;

/// Static descriptor for a single summary state.
#[derive(Debug)]
pub struct StateDescriptor {
    pub id: SummaryState,
    pub name: &'static str,
    /// Mode the ILCs are commanded into when the state is entered.
    pub ilc_mode: IlcMode,
    /// Transition commands accepted while in this state.
    pub accepts: &'static [CommandName],
}

/// Fixed-size table indexed by `SummaryState as usize`.
pub static STATE_TABLE: [StateDescriptor; SummaryState::COUNT] = [
    // Index 0: Standby
    StateDescriptor {
        id: SummaryState::Standby,
        name: "Standby",
        ilc_mode: IlcMode::Standby,
        accepts: &[CommandName::Start, CommandName::ExitControl],
    },
    // Index 1: Disabled
    StateDescriptor {
        id: SummaryState::Disabled,
        name: "Disabled",
        ilc_mode: IlcMode::Disabled,
        accepts: &[CommandName::Enable, CommandName::Standby],
    },
    // Index 2: Enabled
    StateDescriptor {
        id: SummaryState::Enabled,
        name: "Enabled",
        ilc_mode: IlcMode::Enabled,
        accepts: &[CommandName::Disable],
    },
    // Index 3: Fault
    StateDescriptor {
        id: SummaryState::Fault,
        name: "Fault",
        ilc_mode: IlcMode::Disabled,
        accepts: &[CommandName::Standby],
    },
];

pub fn descriptor(state: SummaryState) -> &'static StateDescriptor {
    &STATE_TABLE[state as usize]
}

/// Whether `state` accepts the transition command `name`.
pub fn accepts(state: SummaryState, name: CommandName) -> bool {
    descriptor(state).accepts.contains(&name)
}

/// The state a transition command leads to, or `None` for commands that
/// leave the summary state untouched.
pub fn target(name: CommandName) -> Option<SummaryState> {
    match name {
        CommandName::Start | CommandName::Disable => Some(SummaryState::Disabled),
        CommandName::Enable => Some(SummaryState::Enabled),
        CommandName::Standby => Some(SummaryState::Standby),
        CommandName::ExitControl | CommandName::SetLogLevel => None,
    }
}
