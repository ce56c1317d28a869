//! Implementations for the FlywheelCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{increment_for_error, FlywheelCtrlError, Params};
use crate::eqpt::ActId;
use util::{maths::clamp, module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The actuator channel owned by a regulator.
///
/// Created once at module init with zero target and command, mutated once per
/// tick by the regulator, and re-normalised on every reset.
#[derive(Clone, Copy, Serialize, Debug)]
pub struct ActuatorChannel {
    /// The actuator this channel drives.
    pub id: ActId,

    /// Whether the actuator runs in the inverted (negative) direction.
    pub inverted: bool,

    /// Target rate in counts per 100 ms, sign matching `inverted`.
    pub target_rate_counts: f64,

    /// Commanded output fraction, always in [-1, 1].
    pub command_fraction: f64,

    /// Most recent measured rate in counts per 100 ms.
    pub measured_rate_counts: f64,

    /// Number of ticks the error has been inside the deadband. Saturates at
    /// the stable threshold and is never decremented while settling.
    pub tolerance_streak: u32,
}

/// Flywheel velocity regulator for a single actuator channel.
pub struct FlywheelCtrl {
    pub(crate) params: Params,

    channel: ActuatorChannel,

    ctrl_state: CtrlState,

    /// Remaining ticks of the post-reset settle window, during which the
    /// encoder readout is not yet trusted.
    settle_ticks_remaining: u32,

    /// Ticks since the last reset, used by the divergence guard and reported
    /// in characterization samples.
    ticks_since_reset: u64,

    report: StatusReport,
}

/// Input data to the regulator for one control cycle.
#[derive(Debug, Default)]
pub struct InputData {
    /// A new command for the regulator, or `None` if there is no new command
    /// on this cycle.
    pub cmd: Option<RegCmd>,

    /// The measured rate of the actuator in counts per 100 ms.
    pub measured_rate_counts: f64,
}

/// Output command that the actuator driver must execute.
#[derive(Clone, Copy, Serialize, Debug, Default)]
pub struct OutputData {
    /// Demanded output fraction, in [-1, 1].
    pub command_fraction: f64,
}

/// Status report for FlywheelCtrl processing.
#[derive(Clone, Copy, Serialize, Debug, Default)]
pub struct StatusReport {
    /// Whether the measured rate has stabilised on the target.
    pub status: RegStatus,

    /// Current tolerance streak.
    pub tolerance_streak: u32,

    /// Signed target minus measured error of the last evaluated tick.
    pub raw_error_counts: f64,

    /// True if the command fraction had to be clamped into [-1, 1] at any
    /// point since the last reset.
    pub command_limited: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Regulator status returned by each tick.
#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
pub enum RegStatus {
    /// Still settling towards the target rate.
    Pending,

    /// The measured rate has stabilised inside the deadband, the command is
    /// frozen.
    Stable,
}

/// Commands accepted by the regulator.
#[derive(Clone, Copy, Debug)]
pub enum RegCmd {
    /// Reset onto a new target rate.
    SetTarget {
        rate_counts: f64,
        invert: bool,
    },

    /// Stop the actuator and return to the uninitialised state.
    Stop,
}

/// Internal regulator state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CtrlState {
    /// No target set, command is zero.
    Uninitialised,

    /// Working towards the target rate.
    Settling,

    /// Stable on the target, command frozen.
    Converged,
}

impl Default for RegStatus {
    fn default() -> Self {
        RegStatus::Pending
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FlywheelCtrl {
    /// Create a new regulator for the given actuator channel.
    pub fn new(id: ActId, inverted: bool, params: Params) -> Self {
        Self {
            params,
            channel: ActuatorChannel {
                id,
                inverted,
                target_rate_counts: 0.0,
                command_fraction: 0.0,
                measured_rate_counts: 0.0,
                tolerance_streak: 0,
            },
            ctrl_state: CtrlState::Uninitialised,
            settle_ticks_remaining: 0,
            ticks_since_reset: 0,
            report: StatusReport::default(),
        }
    }

    /// Reset the regulator onto a new target rate.
    ///
    /// The signs of the target and of the carried-over command fraction are
    /// normalised to match `invert`. The command fraction itself is carried
    /// over from the previous run deliberately: repeated resets onto similar
    /// targets then converge much faster than starting from zero.
    pub fn reset(&mut self, target_rate_counts: f64, invert: bool) {
        self.channel.inverted = invert;

        self.channel.target_rate_counts = if invert {
            -target_rate_counts.abs()
        } else {
            target_rate_counts.abs()
        };
        self.channel.command_fraction = if invert {
            -self.channel.command_fraction.abs()
        } else {
            self.channel.command_fraction.abs()
        };

        self.channel.tolerance_streak = 0;
        self.settle_ticks_remaining = self.params.settle_ticks;
        self.ticks_since_reset = 0;
        self.report = StatusReport::default();
        self.ctrl_state = CtrlState::Settling;

        trace!(
            "{:?} reset: target {} counts/100ms, command carried at {:.3}",
            self.channel.id,
            self.channel.target_rate_counts,
            self.channel.command_fraction
        );
    }

    /// Seed the command fraction with an initial guess, normally taken from a
    /// characterization table.
    ///
    /// Only honoured immediately after a reset while the carried-over command
    /// is zero, so a guess can never override a command learnt from a
    /// previous run.
    pub fn seed_command(&mut self, fraction: f64) {
        if self.ctrl_state != CtrlState::Settling
            || self.ticks_since_reset != 0
            || self.channel.command_fraction != 0.0
        {
            return;
        }

        let fraction = clamp(&fraction.abs(), &0.0, &1.0);
        self.channel.command_fraction = if self.channel.inverted {
            -fraction
        } else {
            fraction
        };
    }

    /// Advance the regulator by one control period.
    ///
    /// The caller is expected to have commanded the current
    /// [`FlywheelCtrl::command_fraction`] to the actuator at the start of the
    /// period and to pass in the rate measured afterwards. Once stable the
    /// command is never modified again until the next reset or stop.
    pub fn tick(&mut self, measured_rate_counts: f64) -> Result<RegStatus, FlywheelCtrlError> {
        self.channel.measured_rate_counts = measured_rate_counts;

        match self.ctrl_state {
            CtrlState::Uninitialised => Ok(RegStatus::Pending),
            CtrlState::Converged => Ok(RegStatus::Stable),
            CtrlState::Settling => self.tick_settling(measured_rate_counts),
        }
    }

    /// Stop the actuator. Idempotent, fully resets the regulator state.
    pub fn stop(&mut self) {
        self.channel.command_fraction = 0.0;
        self.channel.target_rate_counts = 0.0;
        self.channel.tolerance_streak = 0;
        self.settle_ticks_remaining = 0;
        self.ticks_since_reset = 0;
        self.report = StatusReport::default();
        self.ctrl_state = CtrlState::Uninitialised;
    }

    /// The current command fraction, to be written to the actuator each
    /// period.
    pub fn command_fraction(&self) -> f64 {
        self.channel.command_fraction
    }

    /// The regulator's current status without advancing it.
    pub fn status(&self) -> RegStatus {
        match self.ctrl_state {
            CtrlState::Converged => RegStatus::Stable,
            _ => RegStatus::Pending,
        }
    }

    pub fn is_stable(&self) -> bool {
        self.ctrl_state == CtrlState::Converged
    }

    /// The actuator channel state, for diagnostics.
    pub fn channel(&self) -> &ActuatorChannel {
        &self.channel
    }

    /// Number of ticks since the last reset.
    pub fn ticks_since_reset(&self) -> u64 {
        self.ticks_since_reset
    }

    /// One settling tick: evaluate the error and nudge the command.
    fn tick_settling(
        &mut self,
        measured_rate_counts: f64,
    ) -> Result<RegStatus, FlywheelCtrlError> {
        self.ticks_since_reset += 1;

        // While the settle window is open the encoder has not yet responded
        // to the commanded output, so hold the command and don't evaluate the
        // error.
        if self.settle_ticks_remaining > 0 {
            self.settle_ticks_remaining -= 1;
            self.report.status = RegStatus::Pending;
            return Ok(RegStatus::Pending);
        }

        let target = self.channel.target_rate_counts;
        let deadband = self.params.deadband_counts;

        let raw_error = target - measured_rate_counts;
        let abs_error = raw_error.abs();
        self.report.raw_error_counts = raw_error;

        // The streak saturates at the threshold and is never decremented,
        // even if a later sample falls back outside the deadband. Known
        // quirk, kept to match the behaviour the mechanism was tuned with.
        if abs_error < deadband {
            self.channel.tolerance_streak =
                (self.channel.tolerance_streak + 1).min(self.params.stable_threshold);
        }
        self.report.tolerance_streak = self.channel.tolerance_streak;

        if self.channel.tolerance_streak >= self.params.stable_threshold {
            self.ctrl_state = CtrlState::Converged;
            self.report.status = RegStatus::Stable;

            trace!(
                "{:?} stable: command {:.3}, error {:.1} counts/100ms, {} ticks",
                self.channel.id,
                self.channel.command_fraction,
                raw_error,
                self.ticks_since_reset
            );

            return Ok(RegStatus::Stable);
        }

        if let Some(max_ticks) = self.params.max_ticks {
            if self.ticks_since_reset >= max_ticks {
                return Err(FlywheelCtrlError::DivergentControl(
                    self.channel.id,
                    self.ticks_since_reset,
                ));
            }
        }

        // Nudge the command towards the deadband by the tier increment
        let incr = increment_for_error(abs_error);

        let mut command = self.channel.command_fraction;
        if measured_rate_counts < target - deadband {
            command += incr;
        } else if measured_rate_counts > target + deadband {
            command -= incr;
        }

        let clamped = clamp(&command, &-1.0, &1.0);
        if clamped != command {
            self.report.command_limited = true;
        }
        self.channel.command_fraction = clamped;

        self.report.status = RegStatus::Pending;
        Ok(RegStatus::Pending)
    }
}

impl State for FlywheelCtrl {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = FlywheelCtrlError;

    /// Initialise the FlywheelCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(
        &mut self,
        init_data: Self::InitData,
        _session: &Session,
    ) -> Result<(), Self::InitError> {
        self.params = params::load(init_data)?;

        Ok(())
    }

    /// Perform cyclic processing of flywheel control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Handle any new command before ticking
        match input_data.cmd {
            Some(RegCmd::SetTarget {
                rate_counts,
                invert,
            }) => self.reset(rate_counts, invert),
            Some(RegCmd::Stop) => self.stop(),
            None => (),
        }

        self.tick(input_data.measured_rate_counts)?;

        Ok((
            OutputData {
                command_fraction: self.channel.command_fraction,
            },
            self.report,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::FlywheelPlant;

    fn test_params() -> Params {
        Params {
            deadband_counts: 50.0,
            stable_threshold: 3,
            settle_ticks: 0,
            max_ticks: Some(5000),
        }
    }

    /// Replay the tier table against an instantaneous linear plant, returning
    /// the number of ticks until the stable threshold is met.
    fn predict_ticks(params: &Params, gain_counts: f64, target: f64) -> u64 {
        let mut command = 0.0f64;
        let mut measured = 0.0f64;
        let mut streak = 0u32;
        let mut ticks = 0u64;

        loop {
            ticks += 1;

            let error = target - measured;
            if error.abs() < params.deadband_counts {
                streak += 1;
            }
            if streak >= params.stable_threshold {
                return ticks;
            }

            let incr = increment_for_error(error.abs());
            if measured < target - params.deadband_counts {
                command += incr;
            } else if measured > target + params.deadband_counts {
                command -= incr;
            }

            measured = gain_counts * command;
        }
    }

    #[test]
    fn test_converges_on_linear_plant() {
        let mut reg = FlywheelCtrl::new(ActId::FlywheelLeft, false, test_params());
        let mut plant = FlywheelPlant::instantaneous(2000.0);

        reg.reset(1000.0, false);

        let mut measured = plant.measured();
        let mut ticks = 0u64;
        loop {
            ticks += 1;
            if reg.tick(measured).unwrap() == RegStatus::Stable {
                break;
            }
            measured = plant.update(reg.command_fraction());
        }

        // Tick count must match the tier table replay exactly
        assert_eq!(ticks, predict_ticks(&test_params(), 2000.0, 1000.0));
        assert_eq!(ticks, 153);

        // Final command must hold the plant inside the deadband
        let settled = plant.update(reg.command_fraction());
        assert!((1000.0 - settled).abs() < 50.0);
        assert!((reg.command_fraction() - 0.475).abs() < 1e-9);
    }

    #[test]
    fn test_command_fraction_never_leaves_unit_range() {
        // A dead plant never responds, so the command ramps all the way up
        let mut reg = FlywheelCtrl::new(
            ActId::FlywheelLeft,
            false,
            Params {
                max_ticks: None,
                ..test_params()
            },
        );

        reg.reset(10000.0, false);

        for _ in 0..1000 {
            reg.tick(0.0).unwrap();
            assert!(reg.command_fraction() >= -1.0);
            assert!(reg.command_fraction() <= 1.0);
        }

        // Ramp saturates at full scale and the clamp is flagged
        assert_eq!(reg.command_fraction(), 1.0);
        let (_, report) = reg
            .proc(&InputData {
                cmd: None,
                measured_rate_counts: 0.0,
            })
            .unwrap();
        assert!(report.command_limited);
    }

    #[test]
    fn test_tolerance_streak_not_reset_by_excursion() {
        let mut reg = FlywheelCtrl::new(ActId::FlywheelLeft, false, test_params());
        reg.reset(1000.0, false);

        // Two ticks inside the deadband
        assert_eq!(reg.tick(990.0).unwrap(), RegStatus::Pending);
        assert_eq!(reg.tick(1010.0).unwrap(), RegStatus::Pending);
        assert_eq!(reg.channel().tolerance_streak, 2);

        // An excursion outside the deadband neither increments nor resets
        assert_eq!(reg.tick(700.0).unwrap(), RegStatus::Pending);
        assert_eq!(reg.channel().tolerance_streak, 2);

        // A third in-deadband tick completes the streak
        assert_eq!(reg.tick(995.0).unwrap(), RegStatus::Stable);
        assert_eq!(reg.channel().tolerance_streak, 3);
    }

    #[test]
    fn test_streak_saturates_at_threshold() {
        let mut reg = FlywheelCtrl::new(ActId::FlywheelLeft, false, test_params());
        reg.reset(100.0, false);

        for _ in 0..10 {
            reg.tick(100.0).unwrap();
        }
        assert_eq!(reg.channel().tolerance_streak, 3);
    }

    #[test]
    fn test_invert_normalises_target_and_command() {
        let mut reg = FlywheelCtrl::new(ActId::FlywheelLeft, true, test_params());

        reg.reset(1000.0, true);
        assert_eq!(reg.channel().target_rate_counts, -1000.0);

        // Measured rate of zero is above target + deadband, so the command
        // must move negative
        reg.tick(0.0).unwrap();
        assert!(reg.command_fraction() < 0.0);

        // Repeated resets stay sign-consistent
        reg.reset(1000.0, true);
        assert_eq!(reg.channel().target_rate_counts, -1000.0);
        assert!(reg.command_fraction() <= 0.0);
    }

    #[test]
    fn test_reset_carries_command_for_faster_convergence() {
        let mut reg = FlywheelCtrl::new(ActId::FlywheelLeft, false, test_params());
        let mut plant = FlywheelPlant::instantaneous(2000.0);

        reg.reset(1000.0, false);
        let mut measured = plant.measured();
        let mut first_run_ticks = 0u64;
        while reg.tick(measured).unwrap() != RegStatus::Stable {
            measured = plant.update(reg.command_fraction());
            first_run_ticks += 1;
        }

        let carried = reg.command_fraction();
        assert!(carried > 0.0);

        // Re-targeting just above keeps the command, so converges quickly
        reg.reset(1100.0, false);
        assert_eq!(reg.command_fraction(), carried);

        let mut second_run_ticks = 0u64;
        while reg.tick(measured).unwrap() != RegStatus::Stable {
            measured = plant.update(reg.command_fraction());
            second_run_ticks += 1;
        }
        assert!(second_run_ticks < first_run_ticks);
    }

    #[test]
    fn test_settle_window_holds_command() {
        let mut reg = FlywheelCtrl::new(
            ActId::FlywheelLeft,
            false,
            Params {
                settle_ticks: 3,
                ..test_params()
            },
        );

        reg.reset(100.0, false);

        // During the settle window nothing is evaluated, even in-deadband
        // measurements
        for _ in 0..3 {
            assert_eq!(reg.tick(100.0).unwrap(), RegStatus::Pending);
            assert_eq!(reg.channel().tolerance_streak, 0);
            assert_eq!(reg.command_fraction(), 0.0);
        }

        // After the window the streak builds as normal
        reg.tick(100.0).unwrap();
        reg.tick(100.0).unwrap();
        assert_eq!(reg.tick(100.0).unwrap(), RegStatus::Stable);
    }

    #[test]
    fn test_divergent_control_guard() {
        let mut reg = FlywheelCtrl::new(
            ActId::FlywheelRight,
            false,
            Params {
                max_ticks: Some(10),
                ..test_params()
            },
        );

        reg.reset(5000.0, false);

        // A dead plant never converges, the guard must fire
        let mut result = Ok(RegStatus::Pending);
        for _ in 0..10 {
            result = reg.tick(0.0);
        }
        assert!(matches!(
            result,
            Err(FlywheelCtrlError::DivergentControl(ActId::FlywheelRight, _))
        ));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut reg = FlywheelCtrl::new(ActId::FlywheelLeft, false, test_params());
        reg.reset(1000.0, false);
        reg.tick(0.0).unwrap();
        assert!(reg.command_fraction() > 0.0);

        reg.stop();
        assert_eq!(reg.command_fraction(), 0.0);
        assert_eq!(reg.channel().tolerance_streak, 0);

        reg.stop();
        assert_eq!(reg.command_fraction(), 0.0);

        // Ticking while uninitialised does nothing
        assert_eq!(reg.tick(500.0).unwrap(), RegStatus::Pending);
        assert_eq!(reg.command_fraction(), 0.0);
    }

    #[test]
    fn test_seed_command_only_after_reset() {
        let mut reg = FlywheelCtrl::new(ActId::FlywheelLeft, true, test_params());

        reg.reset(1000.0, true);
        reg.seed_command(0.3);
        assert_eq!(reg.command_fraction(), -0.3);

        // After a tick the seed is ignored
        reg.tick(0.0).unwrap();
        let cmd = reg.command_fraction();
        reg.seed_command(0.9);
        assert_eq!(reg.command_fraction(), cmd);

        // A carried-over command is never overridden by a seed
        reg.reset(1000.0, true);
        reg.seed_command(0.9);
        assert_eq!(reg.command_fraction(), cmd);
    }

    #[test]
    fn test_proc_drives_regulator() {
        let mut reg = FlywheelCtrl::new(ActId::FlywheelLeft, false, test_params());
        let mut plant = FlywheelPlant::instantaneous(2000.0);

        let mut input = InputData {
            cmd: Some(RegCmd::SetTarget {
                rate_counts: 1000.0,
                invert: false,
            }),
            measured_rate_counts: 0.0,
        };

        for _ in 0..500 {
            let (output, report) = reg.proc(&input).unwrap();
            if report.status == RegStatus::Stable {
                break;
            }
            input = InputData {
                cmd: None,
                measured_rate_counts: plant.update(output.command_fraction),
            };
        }

        assert!(reg.is_stable());

        // Stop through proc zeroes the command
        let (output, _) = reg
            .proc(&InputData {
                cmd: Some(RegCmd::Stop),
                measured_rate_counts: plant.measured(),
            })
            .unwrap();
        assert_eq!(output.command_fraction, 0.0);
    }
}
