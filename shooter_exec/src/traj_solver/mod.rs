//! # Ballistic trajectory solver module
//!
//! Finds the launch angle at which a projectile fired from the tip of a
//! pivoting arm reaches the target, by equalizing the independent horizontal
//! and vertical times of flight over a linear angle scan.
//!
//! The scan is O(N) in the angle range with thousands of trig evaluations, so
//! it has no place inside the periodic control loop. Callers either invoke
//! [`solve`] synchronously off the hot path or hand the query to
//! [`worker::spawn_solver`] and poll the handle for the result.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod solver;
pub mod worker;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use solver::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Gravitational acceleration in in/s^2 (32 ft/s^2), matching the inch-based
/// geometry used throughout the solver.
pub const GRAVITY_IN_PER_S2: f64 = 384.0;

/// Angle scan step in degrees.
pub const ANGLE_SCAN_STEP_DEG: f64 = 0.01;

/// Maximum allowed mismatch between horizontal and vertical times of flight
/// for a solution to be considered valid, in seconds.
pub const TOF_TOLERANCE_S: f64 = 0.1;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during trajectory solving.
///
/// A query with no feasible angle is not an error, it is reported through
/// [`TrajectorySolution::valid`].
#[derive(Debug, thiserror::Error)]
pub enum TrajSolverError {
    #[error("Target horizontal distance must be positive, got {0} in")]
    NonPositiveDistance(f64),

    #[error("Launch speed must be positive, got {0} ft/s")]
    NonPositiveSpeed(f64),

    #[error("Query contains a non-finite value")]
    NonFiniteQuery,

    #[error("Solver worker terminated without producing a result")]
    WorkerTerminated,
}
