//! Characterization sweep parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the characterization sweep
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// First target belt velocity of the sweep in ft/s.
    pub start_fps: f64,

    /// Velocity increase between sweep rungs in ft/s. Must be positive.
    pub step_fps: f64,

    /// Last target belt velocity of the sweep in ft/s.
    pub ceiling_fps: f64,

    /// Number of ticks to hold each converged command before recording the
    /// sample, letting any residual transient die out.
    pub dwell_ticks: u32,

    /// Diameter of the drive wheel in inches.
    pub wheel_diameter_in: f64,

    /// Pulley overdrive ratio between the motor shaft and the wheel.
    pub overdrive_ratio: f64,

    /// Whether to seed freshly reset regulators from the table built so far.
    /// Only takes effect on channels whose carried-over command is zero.
    pub seed_from_table: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            start_fps: 0.0,
            step_fps: 5.0,
            ceiling_fps: 75.0,
            dwell_ticks: 5,
            wheel_diameter_in: 4.0,
            overdrive_ratio: 1.46,
            seed_from_table: true,
        }
    }
}
