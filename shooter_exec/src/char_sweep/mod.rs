//! # Characterization sweep module
//!
//! Steps a set of flywheel regulators through an ascending ladder of target
//! belt velocities, waiting at each rung for every regulator to stabilise,
//! then records the converged command fraction and settling time for each
//! actuator channel into a [`RateTable`](crate::unit_convert::RateTable).
//!
//! The sweep is a per-tick state machine driven by the host's control loop:
//! one [`CharSweep::step`] call per period, with all regulators advanced in
//! lockstep. Recorded samples are archived as CSV into the session directory
//! as they are taken, so an aborted sweep still leaves a usable partial table.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during a characterization sweep.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("Cannot load the sweep parameters: {0}")]
    ParamLoadError(#[from] util::params::LoadError),

    #[error("Sweep velocity step must be positive, got {0} ft/s")]
    NonPositiveStep(f64),

    #[error("Sweep ceiling ({0} ft/s) is below the start velocity ({1} ft/s)")]
    CeilingBelowStart(f64, f64),

    #[error("Cannot run a sweep without any regulator channels")]
    NoChannels,

    #[error("No sensor reading for {0:?}")]
    MissingSensorReading(crate::eqpt::ActId),

    #[error("Regulator diverged during the sweep: {0}")]
    DivergentChannel(#[from] crate::flywheel_ctrl::FlywheelCtrlError),

    #[error("Cannot create the sweep sample archive: {0}")]
    ArchiveInitError(String),
}
