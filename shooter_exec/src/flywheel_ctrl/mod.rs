//! # Flywheel velocity control module
//!
//! Closed-loop regulation of a single flywheel actuator's rotational rate.
//! The regulator does not model the motor; it nudges the commanded output
//! fraction by a fixed increment chosen from an error magnitude tier table
//! until the measured rate has sat inside the deadband for a number of
//! consecutive ticks, at which point the command is frozen and the regulator
//! reports stable.
//!
//! The regulator is driven entirely by the host's fixed-period control loop:
//! one [`FlywheelCtrl::tick`] call per period, no sleeping. The delay needed
//! between commanding the motor and trusting the encoder readout is expressed
//! as a settle window of whole ticks at the start of each settling phase.

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
// CONSTANTS
// ---------------------------------------------------------------------------

/// Error magnitude tiers and the command increments applied within them.
///
/// Errors are in counts per 100 ms. The tiers trade convergence speed against
/// overshoot: large errors take coarse steps, small errors fine ones. Errors
/// at or below the lowest tier get no increment at all, as they fall inside
/// the deadband.
pub const INCREMENT_TIERS: [(f64, f64); 5] = [
    (2000.0, 0.05),
    (1000.0, 0.02),
    (500.0, 0.01),
    (100.0, 0.002),
    (50.0, 0.001),
];

/// Select the command increment for the given absolute rate error.
pub fn increment_for_error(abs_error_counts: f64) -> f64 {
    for (threshold, increment) in INCREMENT_TIERS.iter() {
        if abs_error_counts > *threshold {
            return *increment;
        }
    }

    0.0
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during FlywheelCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum FlywheelCtrlError {
    #[error(
        "Regulator for {0:?} failed to stabilise within {1} ticks, \
         control appears divergent"
    )]
    DivergentControl(crate::eqpt::ActId, u64),
}
