//! Main shooter control executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Characterization loop:
//!         - Actuator sensing
//!         - Sweep processing (regulator ticks)
//!         - Actuator demand execution
//!     - Firing solution request:
//!         - Trajectory solve on the worker thread
//!         - Solution archiving
//!
//! The flywheel actuators are stood in for by the simulated plant, the real
//! motor driver being an external collaborator of this software.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use shooter_lib::{
    char_sweep::CharSweep,
    eqpt::{ActId, FlywheelSens, FLYWHEEL_IDS},
    flywheel_ctrl::FlywheelCtrl,
    sim::FlywheelPlant,
    traj_solver,
};
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one control cycle.
const CYCLE_PERIOD_S: f64 = 0.02;

/// Steady state rate of the simulated flywheels at full scale command, in
/// counts per 100 ms.
const SIM_PLANT_GAIN_COUNTS: f64 = 21000.0;

/// Fraction of the remaining rate change the simulated flywheels apply per
/// cycle.
const SIM_PLANT_ALPHA: f64 = 0.35;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session =
        Session::new("shooter_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Shooter Control Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    // Left flywheel runs inverted so the pair counter-rotate
    let mut regs = vec![
        FlywheelCtrl::new(
            ActId::FlywheelLeft,
            true,
            shooter_lib::flywheel_ctrl::Params::default(),
        ),
        FlywheelCtrl::new(
            ActId::FlywheelRight,
            false,
            shooter_lib::flywheel_ctrl::Params::default(),
        ),
    ];

    for reg in regs.iter_mut() {
        reg.init("flywheel_ctrl.toml", &session)
            .wrap_err("Failed to initialise FlywheelCtrl")?;
    }
    info!("FlywheelCtrl init complete");

    let mut sweep = CharSweep::from_path("char_sweep.toml", regs, &session)
        .wrap_err("Failed to initialise CharSweep")?;
    info!("CharSweep init complete");

    let traj_params: traj_solver::Params =
        util::params::load("traj_solver.toml").wrap_err("Could not load traj solver params")?;
    info!("TrajSolver params loaded");

    // Simulated flywheel plants standing in for the motor driver
    let mut plants: HashMap<ActId, FlywheelPlant> = HashMap::new();
    for id in FLYWHEEL_IDS.iter() {
        plants.insert(
            *id,
            FlywheelPlant::new(SIM_PLANT_GAIN_COUNTS, SIM_PLANT_ALPHA),
        );
    }

    info!("Module initialisation complete\n");

    // ---- CHARACTERIZATION LOOP ----

    info!("Beginning characterization sweep\n");

    let mut sens = FlywheelSens::default();

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // ---- SWEEP PROCESSING ----

        let output = sweep
            .step(&sens)
            .wrap_err("Characterization sweep failed")?;

        if output.complete {
            break;
        }

        // ---- ACTUATOR EXECUTION ----

        // Apply the demands to the plants and read back the rates for the
        // next cycle
        for (id, plant) in plants.iter_mut() {
            let command = output
                .dems
                .command_fraction
                .get(id)
                .copied()
                .unwrap_or(0.0);
            sens.rate_counts.insert(*id, plant.update(command));
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
            ),
        }
    }

    info!("Characterization sweep complete\n");

    // ---- FIRING SOLUTION ----

    // Report the starting command the table would pick for the firing speed
    let table = sweep
        .tables()
        .get(&ActId::FlywheelRight)
        .ok_or_else(|| eyre!("No characterization table for the right flywheel"))?;

    let launch_speed_fps = traj_params.launch_speed_fps;
    if let Some(guess) = table.estimate(launch_speed_fps) {
        info!(
            "Launch speed {} ft/s: initial command guess {:.3}",
            launch_speed_fps, guess
        );
    }

    info!("Requesting firing solution");

    let handle = traj_solver::worker::spawn_solver(traj_params.query(), traj_params.path_kind);

    let solution = handle.wait().wrap_err("Trajectory solve failed")?;

    if solution.valid {
        info!(
            "Firing solution: {:.2} deg ({:?} path), flight time mismatch {:.4} s",
            solution.angle_deg, solution.path_kind, solution.delta_s
        );
    } else {
        warn!(
            "No firing solution for {} ft/s at {} in range",
            traj_params.launch_speed_fps, traj_params.target_horizontal_distance_in
        );
    }

    // Archive the solution in the session
    let mut solution_path = session.session_root.clone();
    solution_path.push("trajectory_solution.json");
    std::fs::write(
        &solution_path,
        serde_json::to_string_pretty(&solution).wrap_err("Cannot serialise the solution")?,
    )
    .wrap_err("Cannot write the solution file")?;

    info!("Solution written to {:?}", solution_path);

    Ok(())
}
