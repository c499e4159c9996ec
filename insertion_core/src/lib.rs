#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Peg-in-hole insertion supervisor (hardware-agnostic).
//!
//! All hardware interactions go through the `insertion_traits::Arm`,
//! `ControllerManager` and `ForceSensor` traits.
//!
//! ## Architecture
//!
//! - **Trajectories**: pure waypoint generators (`trajectory` module)
//! - **Compliance**: phase-indexed impedance schedule (`impedance` module)
//! - **Motion**: controller load/switch and point playback (`motion` module)
//! - **Contact**: debounced force classification (`contact` module)
//! - **Supervisor**: phase dispatch and guards (`machine` module)
//! - **Runtime**: force sampler thread and tick loop (`sampler`, `runner`)

pub mod builder;
pub mod config;
pub mod contact;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod impedance;
pub mod machine;
pub mod mocks;
pub mod motion;
pub mod phase;
pub mod runner;
pub mod sampler;
pub mod sink;
pub mod status;
pub mod trajectory;
pub mod util;

pub use builder::{InsertionBuilder, MachineOptions, Missing, Set, Supervisor, build_machine};
pub use config::{
    ContactCfg, ControlCfg, ControllerNames, DescentCfg, InitialMode, InitialMove, InsertionCfg,
    MotionCfg, SafetyCfg, SpiralCfg, Timeouts,
};
pub use contact::{ContactEvent, ContactMonitor, ContactState};
pub use error::{AbortReason, BuildError, InsertionError, Report, Result};
pub use impedance::{Axes6, ImpedanceParameters, ImpedanceSchedule};
pub use machine::{InsertionStateMachine, Snapshot, StateHandle};
pub use motion::{ControllerKind, Motion, MotionController, StepStatus};
pub use phase::Phase;
pub use runner::{RunParams, RunReport};
pub use sink::{CsvTrajectorySink, MemorySink, TrajectorySink};
pub use status::TickStatus;
pub use trajectory::{JointTrajectory, SpiralParams, Trajectory};
