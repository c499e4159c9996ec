use thiserror::Error;

use crate::phase::Phase;

/// Why a run stopped without reaching `Finish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// Hard cap on run time elapsed.
    MaxRuntime,
    /// Shutdown requested (Ctrl-C or caller flag).
    Shutdown,
    /// The machine was parked in `Idle` by an operator request.
    Paused,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::MaxRuntime => write!(f, "max run time exceeded"),
            AbortReason::Shutdown => write!(f, "shutdown requested"),
            AbortReason::Paused => write!(f, "paused in idle"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InsertionError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("invalid state name: {0:?}")]
    InvalidStateName(String),
    #[error("controller switch failed ({from} -> {to}): {reason}")]
    ControllerSwitchFailed {
        from: String,
        to: String,
        reason: String,
    },
    #[error("missing impedance configuration for phase {0}")]
    MissingConfiguration(Phase),
    #[error("safety bound exceeded: {0}")]
    SafetyBoundExceeded(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("aborted: {0}")]
    Aborted(AbortReason),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing arm")]
    MissingArm,
    #[error("missing controller manager")]
    MissingControllers,
    #[error("missing impedance schedule")]
    MissingSchedule,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
