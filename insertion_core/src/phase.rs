//! The closed set of insertion phases and their fixed forward order.

use std::fmt;
use std::str::FromStr;

use crate::error::InsertionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Start,
    MoveToInitial,
    ExternalDownMovement,
    SpiralMotion,
    InternalDownMovement,
    Straightening,
    InsertionWiggle,
    InternalUpMovement,
    Finish,
    Idle,
}

impl Phase {
    pub const ALL: [Phase; 10] = [
        Phase::Start,
        Phase::MoveToInitial,
        Phase::ExternalDownMovement,
        Phase::SpiralMotion,
        Phase::InternalDownMovement,
        Phase::Straightening,
        Phase::InsertionWiggle,
        Phase::InternalUpMovement,
        Phase::Finish,
        Phase::Idle,
    ];

    /// Phases that drive the arm and therefore need their own impedance entry.
    pub const MOTION: [Phase; 7] = [
        Phase::MoveToInitial,
        Phase::ExternalDownMovement,
        Phase::SpiralMotion,
        Phase::InternalDownMovement,
        Phase::Straightening,
        Phase::InsertionWiggle,
        Phase::InternalUpMovement,
    ];

    /// Canonical name, identical to the variant name.
    pub const fn name(self) -> &'static str {
        match self {
            Phase::Start => "Start",
            Phase::MoveToInitial => "MoveToInitial",
            Phase::ExternalDownMovement => "ExternalDownMovement",
            Phase::SpiralMotion => "SpiralMotion",
            Phase::InternalDownMovement => "InternalDownMovement",
            Phase::Straightening => "Straightening",
            Phase::InsertionWiggle => "InsertionWiggle",
            Phase::InternalUpMovement => "InternalUpMovement",
            Phase::Finish => "Finish",
            Phase::Idle => "Idle",
        }
    }

    /// snake_case key used by configuration tables.
    pub const fn config_key(self) -> &'static str {
        match self {
            Phase::Start => "start",
            Phase::MoveToInitial => "move_to_initial",
            Phase::ExternalDownMovement => "external_down_movement",
            Phase::SpiralMotion => "spiral_motion",
            Phase::InternalDownMovement => "internal_down_movement",
            Phase::Straightening => "straightening",
            Phase::InsertionWiggle => "insertion_wiggle",
            Phase::InternalUpMovement => "internal_up_movement",
            Phase::Finish => "finish",
            Phase::Idle => "idle",
        }
    }

    /// Next phase in the forward order. `Finish` and `Idle` both lead to `Idle`.
    pub const fn next(self) -> Phase {
        match self {
            Phase::Start => Phase::MoveToInitial,
            Phase::MoveToInitial => Phase::ExternalDownMovement,
            Phase::ExternalDownMovement => Phase::SpiralMotion,
            Phase::SpiralMotion => Phase::InternalDownMovement,
            Phase::InternalDownMovement => Phase::Straightening,
            Phase::Straightening => Phase::InsertionWiggle,
            Phase::InsertionWiggle => Phase::InternalUpMovement,
            Phase::InternalUpMovement => Phase::Finish,
            Phase::Finish | Phase::Idle => Phase::Idle,
        }
    }

    pub const fn is_motion(self) -> bool {
        !matches!(self, Phase::Start | Phase::Finish | Phase::Idle)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Phase {
    type Err = InsertionError;

    /// Accepts the canonical name or the snake_case config key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Phase::ALL
            .into_iter()
            .find(|p| p.name() == s || p.config_key() == s)
            .ok_or_else(|| InsertionError::InvalidStateName(s.to_string()))
    }
}
