//! Flywheel control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for flywheel control
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Half width of the tolerance window around the target rate, in counts
    /// per 100 ms. Errors inside the deadband are considered negligible.
    pub deadband_counts: f64,

    /// Number of consecutive in-deadband ticks required before the regulator
    /// declares the rate stable.
    pub stable_threshold: u32,

    /// Number of ticks to hold the command after a reset before trusting the
    /// encoder readout. Replaces the old fixed settle delay, so the regulator
    /// never blocks the control loop.
    pub settle_ticks: u32,

    /// Maximum number of settling ticks allowed before the regulator reports
    /// divergent control. `None` disables the guard.
    #[serde(default)]
    pub max_ticks: Option<u64>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            deadband_counts: 50.0,
            stable_threshold: 3,
            settle_ticks: 2,
            max_ticks: Some(5000),
        }
    }
}
