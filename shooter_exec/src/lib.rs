//! # Shooter control software library
//!
//! This library contains the computational core of the shooter subsystem:
//!
//! - [`flywheel_ctrl`] - per-actuator closed-loop velocity regulation
//! - [`char_sweep`] - offline characterization sweep building command/velocity
//!   tables
//! - [`traj_solver`] - ballistic launch angle solver
//! - [`unit_convert`] - conversions between belt velocity and encoder rate
//!
//! Motor controllers, CAN wiring and operator input are outside the library's
//! boundary. The library sees the plant only as a command fraction going out
//! and a measured encoder rate coming in, with [`sim`] providing a simulated
//! plant for offline runs and tests.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod char_sweep;
pub mod eqpt;
pub mod flywheel_ctrl;
pub mod sim;
pub mod traj_solver;
pub mod unit_convert;
