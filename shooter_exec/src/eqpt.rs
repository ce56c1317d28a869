//! # Shooter equipment boundary types
//!
//! These types form the computational boundary between the control core and
//! the out-of-scope motor driver: command fractions go out in a
//! [`FlywheelDems`], measured encoder rates come back in a [`FlywheelSens`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// All flywheel actuators on the shooter.
pub const FLYWHEEL_IDS: [ActId; 2] = [ActId::FlywheelLeft, ActId::FlywheelRight];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// IDs of the actuators driven by the shooter control core.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum ActId {
    FlywheelLeft,
    FlywheelRight,
}

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Demands sent from the control core to the actuator driver.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FlywheelDems {
    /// The demanded output fraction of an actuator, in [-1, 1].
    pub command_fraction: HashMap<ActId, f64>,
}

/// Sensor data returned by the actuator driver to the control core.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FlywheelSens {
    /// The measured rate of an actuator in encoder counts per 100 ms interval.
    pub rate_counts: HashMap<ActId, f64>,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl Default for FlywheelDems {
    fn default() -> Self {
        let mut command_fraction = HashMap::new();

        for id in FLYWHEEL_IDS.iter() {
            command_fraction.insert(*id, 0.0);
        }

        Self { command_fraction }
    }
}

impl Default for FlywheelSens {
    fn default() -> Self {
        let mut rate_counts = HashMap::new();

        for id in FLYWHEEL_IDS.iter() {
            rate_counts.insert(*id, 0.0);
        }

        Self { rate_counts }
    }
}
