//! # Simulated flywheel plant
//!
//! First order linear model of a flywheel motor, standing in for the real
//! actuator driver during offline characterization runs and in tests. Each
//! update the measured rate moves a fixed fraction of the way towards the
//! rate the commanded output would produce at steady state.

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Simulated flywheel responding linearly to a command fraction.
#[derive(Debug, Clone)]
pub struct FlywheelPlant {
    /// Steady state rate at full scale command, in counts per 100 ms.
    gain_counts: f64,

    /// Fraction of the remaining rate change applied per update, in (0, 1].
    alpha: f64,

    /// Current measured rate in counts per 100 ms.
    measured_counts: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FlywheelPlant {
    /// Create a new plant at rest.
    pub fn new(gain_counts: f64, alpha: f64) -> Self {
        Self {
            gain_counts,
            alpha,
            measured_counts: 0.0,
        }
    }

    /// Create a plant which reaches steady state in a single update.
    pub fn instantaneous(gain_counts: f64) -> Self {
        Self::new(gain_counts, 1.0)
    }

    /// Apply a command fraction and advance the plant by one control period,
    /// returning the new measured rate.
    pub fn update(&mut self, command_fraction: f64) -> f64 {
        self.measured_counts +=
            self.alpha * (self.gain_counts * command_fraction - self.measured_counts);
        self.measured_counts
    }

    /// The current measured rate in counts per 100 ms.
    pub fn measured(&self) -> f64 {
        self.measured_counts
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_instantaneous_plant() {
        let mut plant = FlywheelPlant::instantaneous(2000.0);
        assert_eq!(plant.update(0.5), 1000.0);
        assert_eq!(plant.update(0.5), 1000.0);
        assert_eq!(plant.update(0.0), 0.0);
    }

    #[test]
    fn test_first_order_plant_approaches_steady_state() {
        let mut plant = FlywheelPlant::new(1000.0, 0.5);
        assert_eq!(plant.update(1.0), 500.0);
        assert_eq!(plant.update(1.0), 750.0);

        for _ in 0..100 {
            plant.update(1.0);
        }
        assert!((plant.measured() - 1000.0).abs() < 1e-6);
    }
}
