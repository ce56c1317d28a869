//! # Unit conversion module
//!
//! Pure conversions between belt linear velocity (feet per second) and the
//! actuator's native rate units (encoder counts per 100 ms readout interval),
//! accounting for the drive wheel diameter and the pulley overdrive ratio.
//!
//! Also provides [`RateTable`], a monotonic lookup table of characterization
//! samples used to pick a starting command fraction for a target velocity,
//! which shortens regulator settling times considerably.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Internal
use util::maths::lin_map;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Encoder counts per motor shaft revolution.
pub const ENCODER_COUNTS_PER_REV: f64 = 2048.0;

/// Number of encoder readout intervals per second (100 ms readout interval).
pub const INTERVALS_PER_SECOND: f64 = 10.0;

/// Inches per foot.
pub const IN_PER_FT: f64 = 12.0;

/// Command fractions of the bench characterization table, one entry every
/// 5 ft/s from 0 to 75 ft/s, determined empirically on the test board with
/// the 4 in wheel and 1.46:1 overdrive.
const BENCH_TABLE_FRACTIONS: [f64; 16] = [
    0.0, 0.07, 0.10, 0.12, 0.15, 0.18, 0.21, 0.24, 0.26, 0.29, 0.32, 0.35, 0.38, 0.41, 0.44, 0.47,
];

/// Velocity step between bench table entries in ft/s.
const BENCH_TABLE_STEP_FPS: f64 = 5.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One converged point of a characterization sweep.
///
/// Samples are immutable once recorded and are only ever appended, in
/// ascending target velocity order, by the sweep.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CharacterizationSample {
    /// Target belt velocity in ft/s.
    pub target_fps: f64,

    /// The command fraction the regulator had converged on.
    pub command_fraction: f64,

    /// Number of control ticks the regulator took to converge.
    pub ticks_to_converge: u64,
}

/// Monotonic lookup table mapping target belt velocity to a starting command
/// fraction.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    samples: Vec<CharacterizationSample>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with building a [`RateTable`].
#[derive(Debug, Error)]
pub enum TableError {
    #[error(
        "Characterization samples must have strictly increasing target \
         velocities ({0} ft/s recorded after {1} ft/s)"
    )]
    NonMonotonicSample(f64, f64),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a belt linear velocity in ft/s to the motor rotational rate in
/// encoder counts per 100 ms interval.
///
/// The wheel diameter is given in inches. The overdrive ratio is the pulley
/// speed multiplication between the motor shaft and the wheel, which reduces
/// the motor rate required for a given belt velocity.
pub fn counts_per_interval(
    velocity_fps: f64,
    wheel_diameter_in: f64,
    overdrive_ratio: f64,
) -> f64 {
    velocity_fps / (std::f64::consts::PI * (wheel_diameter_in / IN_PER_FT)) / overdrive_ratio
        * ENCODER_COUNTS_PER_REV
        / INTERVALS_PER_SECOND
}

/// Convert a motor rotational rate in encoder counts per 100 ms interval back
/// to the belt linear velocity in ft/s. Exact inverse of
/// [`counts_per_interval`].
pub fn velocity_from_counts(
    counts_per_interval: f64,
    wheel_diameter_in: f64,
    overdrive_ratio: f64,
) -> f64 {
    counts_per_interval / ENCODER_COUNTS_PER_REV
        * INTERVALS_PER_SECOND
        * overdrive_ratio
        * (std::f64::consts::PI * (wheel_diameter_in / IN_PER_FT))
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RateTable {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    /// The bench table generated on the test board, usable as an initial
    /// guess source before any sweep has been run on the actual mechanism.
    pub fn bench_default() -> Self {
        let samples = BENCH_TABLE_FRACTIONS
            .iter()
            .enumerate()
            .map(|(i, frac)| CharacterizationSample {
                target_fps: i as f64 * BENCH_TABLE_STEP_FPS,
                command_fraction: *frac,
                ticks_to_converge: 0,
            })
            .collect();

        Self { samples }
    }

    /// Build a table from recorded samples, which must be in strictly
    /// increasing target velocity order.
    pub fn from_samples(samples: Vec<CharacterizationSample>) -> Result<Self, TableError> {
        let mut table = Self::new();
        for sample in samples {
            table.push(sample)?;
        }
        Ok(table)
    }

    /// Append a sample to the table.
    pub fn push(&mut self, sample: CharacterizationSample) -> Result<(), TableError> {
        if let Some(last) = self.samples.last() {
            if sample.target_fps <= last.target_fps {
                return Err(TableError::NonMonotonicSample(
                    sample.target_fps,
                    last.target_fps,
                ));
            }
        }

        self.samples.push(sample);
        Ok(())
    }

    /// Estimate the command fraction for the given target velocity by linear
    /// interpolation between the two nearest recorded samples.
    ///
    /// Outside the recorded range the nearest boundary sample's command
    /// fraction is returned. `None` if the table is empty.
    pub fn estimate(&self, target_fps: f64) -> Option<f64> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;

        if target_fps <= first.target_fps {
            return Some(first.command_fraction);
        }
        if target_fps >= last.target_fps {
            return Some(last.command_fraction);
        }

        // Find the bracketing pair of samples
        for pair in self.samples.windows(2) {
            if target_fps >= pair[0].target_fps && target_fps <= pair[1].target_fps {
                return Some(lin_map(
                    (pair[0].target_fps, pair[1].target_fps),
                    (pair[0].command_fraction, pair[1].command_fraction),
                    target_fps,
                ));
            }
        }

        None
    }

    /// The recorded samples in ascending target velocity order.
    pub fn samples(&self) -> &[CharacterizationSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Expected rate for 60 ft/s with the 4 in wheel and 1.46:1 overdrive,
    /// computed once from the reference formula.
    const EXPECTED_60_FPS_COUNTS: f64 = 8037.106605670728;

    #[test]
    fn test_counts_per_interval_reference_value() {
        let counts = counts_per_interval(60.0, 4.0, 1.46);
        assert!((counts - EXPECTED_60_FPS_COUNTS).abs() < 1e-6);
    }

    #[test]
    fn test_velocity_round_trip() {
        let counts = counts_per_interval(42.5, 4.0, 1.46);
        let velocity = velocity_from_counts(counts, 4.0, 1.46);
        assert!((velocity - 42.5).abs() < 1e-9);
    }

    #[test]
    fn test_bench_table_covers_sweep_range() {
        let table = RateTable::bench_default();
        assert_eq!(table.len(), 16);
        assert_eq!(table.samples()[0].target_fps, 0.0);
        assert_eq!(table.samples()[15].target_fps, 75.0);
        assert_eq!(table.samples()[15].command_fraction, 0.47);
    }

    #[test]
    fn test_estimate_interpolates_between_samples() {
        let table = RateTable::bench_default();

        // Half way between the 5 ft/s (0.07) and 10 ft/s (0.10) entries
        let est = table.estimate(7.5).unwrap();
        assert!((est - 0.085).abs() < 1e-9);

        // Exactly on a sample
        assert_eq!(table.estimate(20.0).unwrap(), 0.15);
    }

    #[test]
    fn test_estimate_clamps_to_boundaries() {
        let table = RateTable::bench_default();
        assert_eq!(table.estimate(-10.0).unwrap(), 0.0);
        assert_eq!(table.estimate(200.0).unwrap(), 0.47);
    }

    #[test]
    fn test_estimate_empty_table() {
        assert!(RateTable::new().estimate(30.0).is_none());
    }

    #[test]
    fn test_non_monotonic_sample_rejected() {
        let mut table = RateTable::new();
        table
            .push(CharacterizationSample {
                target_fps: 10.0,
                command_fraction: 0.1,
                ticks_to_converge: 5,
            })
            .unwrap();

        let res = table.push(CharacterizationSample {
            target_fps: 10.0,
            command_fraction: 0.2,
            ticks_to_converge: 5,
        });
        assert!(res.is_err());
    }
}
