//! Trajectory solver parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::{PathKind, TrajectoryQuery};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters describing the fixed launch geometry and the default query.
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Launch speed of the projectile in ft/s.
    pub launch_speed_fps: f64,

    /// Horizontal distance from the pivot to the target in inches.
    pub target_horizontal_distance_in: f64,

    /// Height of the target above the floor in inches.
    pub target_height_in: f64,

    /// Height of the pivot above the floor in inches.
    pub floor_offset_in: f64,

    /// Length of the pivoting launch arm in inches.
    pub pivot_arm_length_in: f64,

    /// Which root of the vertical flight time quadratic to aim for.
    pub path_kind: PathKind,
}

impl Params {
    /// The query described by these parameters.
    pub fn query(&self) -> TrajectoryQuery {
        TrajectoryQuery {
            launch_speed_fps: self.launch_speed_fps,
            target_horizontal_distance_in: self.target_horizontal_distance_in,
            target_height_in: self.target_height_in,
            floor_offset_in: self.floor_offset_in,
            pivot_arm_length_in: self.pivot_arm_length_in,
        }
    }
}
