//! Implementations for the CharSweep state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use serde::Serialize;
use std::collections::HashMap;

// Internal
use super::{Params, SweepError};
use crate::eqpt::{ActId, FlywheelDems, FlywheelSens};
use crate::flywheel_ctrl::FlywheelCtrl;
use crate::unit_convert::{self, CharacterizationSample, RateTable};
use util::{archive::Archiver, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Characterization sweep over a set of flywheel regulator channels.
pub struct CharSweep {
    params: Params,

    /// The regulators under characterization, advanced in lockstep.
    regs: Vec<FlywheelCtrl>,

    /// Per channel tables of recorded samples.
    tables: HashMap<ActId, RateTable>,

    sweep_state: SweepState,

    /// Target belt velocity of the current rung in ft/s.
    current_target_fps: f64,

    /// Archiver for recorded samples. An unattached archiver discards writes.
    archiver: Archiver,
}

/// Output of one sweep step.
#[derive(Debug, Clone)]
pub struct SweepOutput {
    /// Demands to write to the actuator driver for the coming period.
    pub dems: FlywheelDems,

    /// True once every rung up to the ceiling has been recorded.
    pub complete: bool,
}

/// A recorded sample as written to the session archive.
#[derive(Serialize)]
struct SampleRecord {
    act_id: ActId,
    target_fps: f64,
    command_fraction: f64,
    ticks_to_converge: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Sweep state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
enum SweepState {
    /// Reset the regulators onto the next rung's target.
    NextTarget,

    /// Waiting for every regulator to stabilise on the current rung.
    Settling,

    /// All regulators stable, holding the commands before recording.
    Dwell { ticks_left: u32 },

    /// All rungs recorded, actuators stopped.
    Complete,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CharSweep {
    /// Create a new sweep over the given regulators without archiving.
    pub fn new(params: Params, regs: Vec<FlywheelCtrl>) -> Result<Self, SweepError> {
        if params.step_fps <= 0.0 {
            return Err(SweepError::NonPositiveStep(params.step_fps));
        }
        if params.ceiling_fps < params.start_fps {
            return Err(SweepError::CeilingBelowStart(
                params.ceiling_fps,
                params.start_fps,
            ));
        }
        if regs.is_empty() {
            return Err(SweepError::NoChannels);
        }

        let tables = regs
            .iter()
            .map(|reg| (reg.channel().id, RateTable::new()))
            .collect();

        let current_target_fps = params.start_fps;

        Ok(Self {
            params,
            regs,
            tables,
            sweep_state: SweepState::NextTarget,
            current_target_fps,
            archiver: Archiver::default(),
        })
    }

    /// Create a new sweep with parameters loaded from the given file and
    /// samples archived into the session.
    pub fn from_path(
        params_path: &str,
        regs: Vec<FlywheelCtrl>,
        session: &Session,
    ) -> Result<Self, SweepError> {
        let params: Params = params::load(params_path)?;

        let mut sweep = Self::new(params, regs)?;

        sweep.archiver = Archiver::from_path(session, "char_sweep/samples.csv")
            .map_err(|e| SweepError::ArchiveInitError(format!("{}", e)))?;

        Ok(sweep)
    }

    /// Advance the sweep by one control period.
    ///
    /// The caller writes the returned demands to the actuator driver at the
    /// start of each period and passes the sensor data measured afterwards
    /// into the next step.
    pub fn step(&mut self, sens: &FlywheelSens) -> Result<SweepOutput, SweepError> {
        match self.sweep_state {
            SweepState::Complete => {
                return Ok(SweepOutput {
                    dems: self.dems(),
                    complete: true,
                })
            }
            SweepState::NextTarget => {
                self.reset_onto_current_target();
                self.sweep_state = SweepState::Settling;
            }
            _ => (),
        }

        // Tick every regulator. Converged regulators hold their command, so
        // ticking through the dwell is harmless.
        let mut all_stable = true;
        for reg in self.regs.iter_mut() {
            let id = reg.channel().id;
            let measured = *sens
                .rate_counts
                .get(&id)
                .ok_or(SweepError::MissingSensorReading(id))?;

            reg.tick(measured)?;
            all_stable &= reg.is_stable();
        }

        match self.sweep_state {
            SweepState::Settling if all_stable => {
                if self.params.dwell_ticks > 0 {
                    self.sweep_state = SweepState::Dwell {
                        ticks_left: self.params.dwell_ticks,
                    };
                } else {
                    self.record_rung();
                    self.advance_rung();
                }
            }
            SweepState::Dwell { ticks_left } => {
                if ticks_left > 1 {
                    self.sweep_state = SweepState::Dwell {
                        ticks_left: ticks_left - 1,
                    };
                } else {
                    self.record_rung();
                    self.advance_rung();
                }
            }
            _ => (),
        }

        Ok(SweepOutput {
            dems: self.dems(),
            complete: self.sweep_state == SweepState::Complete,
        })
    }

    /// The per channel tables recorded so far.
    pub fn tables(&self) -> &HashMap<ActId, RateTable> {
        &self.tables
    }

    pub fn is_complete(&self) -> bool {
        self.sweep_state == SweepState::Complete
    }

    /// Target belt velocity of the current rung in ft/s.
    pub fn current_target_fps(&self) -> f64 {
        self.current_target_fps
    }

    /// Reset every regulator onto the current rung's target rate.
    fn reset_onto_current_target(&mut self) {
        let target_fps = self.current_target_fps;
        let target_counts = unit_convert::counts_per_interval(
            target_fps,
            self.params.wheel_diameter_in,
            self.params.overdrive_ratio,
        );

        for reg in self.regs.iter_mut() {
            let id = reg.channel().id;
            let invert = reg.channel().inverted;

            reg.reset(target_counts, invert);

            if self.params.seed_from_table {
                if let Some(est) = self.tables.get(&id).and_then(|t| t.estimate(target_fps)) {
                    reg.seed_command(est);
                }
            }
        }

        info!(
            "Sweep rung {} ft/s ({:.1} counts/100ms)",
            target_fps, target_counts
        );
    }

    /// Record the converged sample of every channel for the current rung.
    fn record_rung(&mut self) {
        for reg in self.regs.iter() {
            let id = reg.channel().id;

            let sample = CharacterizationSample {
                target_fps: self.current_target_fps,
                command_fraction: reg.command_fraction().abs(),
                ticks_to_converge: reg.ticks_since_reset(),
            };

            info!(
                "{:?} @ {} ft/s: command {:.3}, {} ticks to converge",
                id, sample.target_fps, sample.command_fraction, sample.ticks_to_converge
            );

            if let Some(table) = self.tables.get_mut(&id) {
                // The sweep only ever ascends, so pushing cannot fail
                if let Err(e) = table.push(sample) {
                    warn!("Could not record sample for {:?}: {}", id, e);
                }
            }

            if let Err(e) = self.archiver.serialise(SampleRecord {
                act_id: id,
                target_fps: sample.target_fps,
                command_fraction: sample.command_fraction,
                ticks_to_converge: sample.ticks_to_converge,
            }) {
                warn!("Could not archive sample for {:?}: {}", id, e);
            }
        }
    }

    /// Move to the next rung, or complete the sweep past the ceiling.
    fn advance_rung(&mut self) {
        self.current_target_fps += self.params.step_fps;

        if self.current_target_fps > self.params.ceiling_fps + 1e-9 {
            for reg in self.regs.iter_mut() {
                reg.stop();
            }
            self.sweep_state = SweepState::Complete;

            info!("Characterization sweep complete");
        } else {
            self.sweep_state = SweepState::NextTarget;
        }
    }

    /// Current demands of every regulator channel.
    fn dems(&self) -> FlywheelDems {
        let mut dems = FlywheelDems::default();

        for reg in self.regs.iter() {
            dems.command_fraction
                .insert(reg.channel().id, reg.command_fraction());
        }

        dems
    }
}
