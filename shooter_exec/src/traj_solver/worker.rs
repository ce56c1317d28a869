//! Background solver worker
//!
//! Runs the angle scan on its own thread so the periodic control loop never
//! waits on it, delivering the result back over a channel.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::thread;

// Internal
use super::{solve, PathKind, TrajSolverError, TrajectoryQuery, TrajectorySolution};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Handle to a solver run in progress.
pub struct SolverHandle {
    receiver: Receiver<Result<TrajectorySolution, TrajSolverError>>,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Start solving the given query on a background thread.
pub fn spawn_solver(query: TrajectoryQuery, path_kind: PathKind) -> SolverHandle {
    let (sender, receiver) = channel();

    thread::spawn(move || {
        debug!("Solver worker started");

        // The caller may have dropped the handle in the meantime, in which
        // case there is nobody left to tell.
        let _ = sender.send(solve(&query, path_kind));
    });

    SolverHandle { receiver }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SolverHandle {
    /// Check for the result without blocking. `None` while the solver is
    /// still running.
    pub fn poll(&self) -> Option<Result<TrajectorySolution, TrajSolverError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(TrajSolverError::WorkerTerminated)),
        }
    }

    /// Block until the result is available.
    pub fn wait(self) -> Result<TrajectorySolution, TrajSolverError> {
        match self.receiver.recv() {
            Ok(result) => result,
            Err(_) => Err(TrajSolverError::WorkerTerminated),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_worker_delivers_solution() {
        let query = TrajectoryQuery {
            launch_speed_fps: 50.0,
            target_horizontal_distance_in: 120.0,
            target_height_in: 98.25,
            floor_offset_in: 24.0,
            pivot_arm_length_in: 35.0,
        };

        let handle = spawn_solver(query, PathKind::Short);
        let solution = handle.wait().unwrap();

        assert!(solution.valid);
        assert_eq!(solution, solve(&query, PathKind::Short).unwrap());
    }

    #[test]
    fn test_worker_reports_query_errors() {
        let query = TrajectoryQuery {
            launch_speed_fps: 50.0,
            target_horizontal_distance_in: -10.0,
            target_height_in: 98.25,
            floor_offset_in: 24.0,
            pivot_arm_length_in: 35.0,
        };

        let handle = spawn_solver(query, PathKind::Short);
        assert!(matches!(
            handle.wait(),
            Err(TrajSolverError::NonPositiveDistance(_))
        ));
    }

    #[test]
    fn test_poll_eventually_returns() {
        let query = TrajectoryQuery {
            launch_speed_fps: 50.0,
            target_horizontal_distance_in: 120.0,
            target_height_in: 98.25,
            floor_offset_in: 24.0,
            pivot_arm_length_in: 35.0,
        };

        let handle = spawn_solver(query, PathKind::Long);

        let mut polls = 0u32;
        loop {
            if let Some(result) = handle.poll() {
                assert!(result.is_ok());
                break;
            }

            polls += 1;
            assert!(polls < 100_000);
            thread::sleep(std::time::Duration::from_millis(1));
        }
    }
}
