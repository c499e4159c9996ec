//! Hardware backends for the insertion supervisor.
//!
//! Only the simulated world ships here; a robot driver implements the same
//! `insertion_traits` and maps its failures onto [`error::HwError`].

pub mod error;
pub mod sim;
pub mod util;

pub use sim::{SimParams, SimWorld, SimulatedArm, SimulatedControllers, SimulatedForceSensor};
