//! Outcome of a single supervisory tick.

use crate::error::InsertionError;
use crate::phase::Phase;

#[derive(Debug, Clone, PartialEq)]
pub enum TickStatus {
    /// Still working on the phase's motion; no transition this tick.
    Running(Phase),
    /// Guard satisfied; the new phase is entered on the next tick.
    Transitioned { from: Phase, to: Phase },
    /// Parked in `Idle`, waiting for an external `change_state`.
    Idle,
    /// A phase failed. Safety and timeout failures have already parked the
    /// machine in `Idle`; a controller switch failure holds the phase.
    Halted(InsertionError),
}

impl TickStatus {
    pub fn is_halted(&self) -> bool {
        matches!(self, TickStatus::Halted(_))
    }
}
