//! Trajectory solver core

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::{Deserialize, Serialize};

// Internal
use super::{TrajSolverError, ANGLE_SCAN_STEP_DEG, GRAVITY_IN_PER_S2, TOF_TOLERANCE_S};
use crate::unit_convert::IN_PER_FT;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Launch geometry and speed for a firing solution request.
///
/// All distances in inches, measured from the arm pivot unless stated
/// otherwise. The launch point is the tip of the pivoting arm, so the
/// effective distances to the target depend on the launch angle itself.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryQuery {
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
}

impl TrajectoryQuery {
    /// Whether every field of the query is a finite number.
    pub fn is_finite(&self) -> bool {
        self.launch_speed_fps.is_finite()
            && self.target_horizontal_distance_in.is_finite()
            && self.target_height_in.is_finite()
            && self.floor_offset_in.is_finite()
            && self.pivot_arm_length_in.is_finite()
    }
}

/// The result of a trajectory solve.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TrajectorySolution {
    /// The launch angle in degrees above horizontal.
    ///
    /// Only meaningful if `valid` is true; an invalid solution carries the
    /// least-bad angle found for diagnostics.
    pub angle_deg: f64,

    /// The path kind the solution was computed for.
    pub path_kind: PathKind,

    /// Best achieved flight time mismatch over the scan, in seconds.
    pub delta_s: f64,

    /// Whether the mismatch is inside the flight time tolerance. A query can
    /// legitimately have no solution, so callers must check this flag rather
    /// than interpreting any angle value as a sentinel.
    pub valid: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Which root of the vertical flight time quadratic to aim for.
///
/// The short path hits the target on the way up, the long path lobs the
/// projectile and hits it on the way down.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Short,
    Long,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Find the launch angle equalizing horizontal and vertical flight times.
///
/// Scans angles from the line-of-sight minimum up to (but excluding) vertical
/// in fixed increments, tracking the angle with the smallest flight time
/// mismatch for the requested path kind. Queries with degenerate geometry are
/// rejected before the scan begins.
pub fn solve(
    query: &TrajectoryQuery,
    path_kind: PathKind,
) -> Result<TrajectorySolution, TrajSolverError> {
    if query.target_horizontal_distance_in <= 0.0 {
        return Err(TrajSolverError::NonPositiveDistance(
            query.target_horizontal_distance_in,
        ));
    }
    if query.launch_speed_fps <= 0.0 {
        return Err(TrajSolverError::NonPositiveSpeed(query.launch_speed_fps));
    }
    if !query.is_finite() {
        return Err(TrajSolverError::NonFiniteQuery);
    }

    let theta_min = min_theta_deg(query);

    let mut best_theta_deg = theta_min;
    let mut best_delta_s = std::f64::INFINITY;

    let mut theta_deg = theta_min;
    while theta_deg < 90.0 {
        let theta_rad = theta_deg.to_radians();

        // Angles where either axis has no real flight time are infeasible
        // samples, not scan-aborting conditions.
        if let (Some(t_x), Some(t_y)) = (
            tof_x(query, theta_rad),
            tof_y(query, theta_rad, path_kind),
        ) {
            let delta = (t_y - t_x).abs();
            if delta < best_delta_s {
                best_delta_s = delta;
                best_theta_deg = theta_deg;
            }
        }

        theta_deg += ANGLE_SCAN_STEP_DEG;
    }

    let valid = best_delta_s <= TOF_TOLERANCE_S;

    debug!(
        "Trajectory solve ({:?}): theta {:.3} deg, delta {:.4} s, valid: {}",
        path_kind, best_theta_deg, best_delta_s, valid
    );

    Ok(TrajectorySolution {
        angle_deg: best_theta_deg,
        path_kind,
        delta_s: best_delta_s,
        valid,
    })
}

/// Minimum feasible launch angle in degrees, the line of sight from the pivot
/// to the target.
pub fn min_theta_deg(query: &TrajectoryQuery) -> f64 {
    ((query.target_height_in - query.floor_offset_in) / query.target_horizontal_distance_in)
        .atan()
        .to_degrees()
}

/// Horizontal time of flight at the given launch angle, `None` at or beyond
/// vertical where the horizontal launch speed component vanishes.
pub fn tof_x(query: &TrajectoryQuery, theta_rad: f64) -> Option<f64> {
    // cos(pi/2) is a tiny positive float rather than zero, so guard on the
    // angle itself
    if theta_rad >= std::f64::consts::FRAC_PI_2 {
        return None;
    }

    let cos_theta = theta_rad.cos();

    let v_x = query.launch_speed_fps * cos_theta * IN_PER_FT;
    if v_x <= 0.0 {
        return None;
    }

    let x = query.target_horizontal_distance_in - query.pivot_arm_length_in * cos_theta;

    Some(x / v_x)
}

/// Vertical time of flight at the given launch angle for the given path kind,
/// `None` where the projectile cannot reach the target height.
pub fn tof_y(query: &TrajectoryQuery, theta_rad: f64, path_kind: PathKind) -> Option<f64> {
    let sin_theta = theta_rad.sin();

    let v_0y = query.launch_speed_fps * sin_theta * IN_PER_FT;
    let y =
        query.target_height_in - query.floor_offset_in - query.pivot_arm_length_in * sin_theta;

    let discriminant = v_0y * v_0y - 2.0 * GRAVITY_IN_PER_S2 * y;
    if discriminant < 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    let t = match path_kind {
        PathKind::Short => (v_0y - root) / GRAVITY_IN_PER_S2,
        PathKind::Long => (v_0y + root) / GRAVITY_IN_PER_S2,
    };

    Some(t)
}

/// Projectile position relative to the pivot at the given time after launch,
/// as `(x, y)` in inches. Starts at the arm tip.
pub fn position_at(query: &TrajectoryQuery, angle_deg: f64, time_s: f64) -> (f64, f64) {
    let theta_rad = angle_deg.to_radians();

    let v_x = query.launch_speed_fps * theta_rad.cos() * IN_PER_FT;
    let v_0y = query.launch_speed_fps * theta_rad.sin() * IN_PER_FT;

    let x = query.pivot_arm_length_in * theta_rad.cos() + v_x * time_s;
    let y = query.pivot_arm_length_in * theta_rad.sin() + v_0y * time_s
        - 0.5 * GRAVITY_IN_PER_S2 * time_s * time_s;

    (x, y)
}

#[cfg(test)]
mod test {
    use super::*;

    /// The bench geometry: 10 ft to the target face, 98.25 in target height,
    /// pivot 24 in off the floor on a 35 in arm.
    fn bench_query() -> TrajectoryQuery {
        TrajectoryQuery {
            launch_speed_fps: 50.0,
            target_horizontal_distance_in: 120.0,
            target_height_in: 98.25,
            floor_offset_in: 24.0,
            pivot_arm_length_in: 35.0,
        }
    }

    #[test]
    fn test_bench_geometry_has_short_solution() {
        let query = bench_query();
        let solution = solve(&query, PathKind::Short).unwrap();

        assert!(solution.valid);
        assert!(solution.delta_s <= TOF_TOLERANCE_S);
        assert!(solution.angle_deg >= min_theta_deg(&query));
        assert!(solution.angle_deg < 90.0);
    }

    #[test]
    fn test_flight_times_match_at_solution() {
        let query = bench_query();
        let solution = solve(&query, PathKind::Short).unwrap();

        let theta_rad = solution.angle_deg.to_radians();
        let t_x = tof_x(&query, theta_rad).unwrap();
        let t_y = tof_y(&query, theta_rad, PathKind::Short).unwrap();
        assert!((t_x - t_y).abs() <= TOF_TOLERANCE_S);
    }

    #[test]
    fn test_long_path_is_steeper_than_short() {
        let query = bench_query();

        let short = solve(&query, PathKind::Short).unwrap();
        let long = solve(&query, PathKind::Long).unwrap();

        assert!(long.angle_deg > short.angle_deg);
    }

    #[test]
    fn test_projectile_arrives_at_target() {
        let query = bench_query();
        let solution = solve(&query, PathKind::Short).unwrap();

        let theta_rad = solution.angle_deg.to_radians();
        let t = tof_x(&query, theta_rad).unwrap();

        let (x, y) = position_at(&query, solution.angle_deg, t);

        // Horizontal arrival is exact by construction, vertical within the
        // small flight time mismatch times the arrival speed
        assert!((x - query.target_horizontal_distance_in).abs() < 1e-9);
        assert!((y - (query.target_height_in - query.floor_offset_in)).abs() < 1.0);
    }

    #[test]
    fn test_unreachable_target_reports_no_solution() {
        // A slow launch cannot reach a high target, but this is a result,
        // not an error
        let query = TrajectoryQuery {
            launch_speed_fps: 10.0,
            target_horizontal_distance_in: 240.0,
            target_height_in: 200.0,
            floor_offset_in: 24.0,
            pivot_arm_length_in: 35.0,
        };

        let solution = solve(&query, PathKind::Short).unwrap();
        assert!(!solution.valid);
    }

    #[test]
    fn test_vertical_angle_is_infeasible_sample() {
        let query = bench_query();

        // No division by zero or near-zero at and beyond theta = 90 deg
        assert!(tof_x(&query, 90.0_f64.to_radians()).is_none());
        assert!(tof_x(&query, 91.0_f64.to_radians()).is_none());

        // Just below vertical is still a feasible sample
        assert!(tof_x(&query, 89.99_f64.to_radians()).is_some());
    }

    #[test]
    fn test_negative_discriminant_is_infeasible_sample() {
        let query = TrajectoryQuery {
            launch_speed_fps: 5.0,
            target_horizontal_distance_in: 120.0,
            target_height_in: 200.0,
            floor_offset_in: 24.0,
            pivot_arm_length_in: 35.0,
        };

        assert!(tof_y(&query, 45.0_f64.to_radians(), PathKind::Short).is_none());
    }

    #[test]
    fn test_degenerate_geometry_rejected() {
        let mut query = bench_query();
        query.target_horizontal_distance_in = 0.0;
        assert!(matches!(
            solve(&query, PathKind::Short),
            Err(TrajSolverError::NonPositiveDistance(_))
        ));

        let mut query = bench_query();
        query.launch_speed_fps = -1.0;
        assert!(matches!(
            solve(&query, PathKind::Short),
            Err(TrajSolverError::NonPositiveSpeed(_))
        ));

        let mut query = bench_query();
        query.target_height_in = std::f64::NAN;
        assert!(matches!(
            solve(&query, PathKind::Short),
            Err(TrajSolverError::NonFiniteQuery)
        ));
    }

    #[test]
    fn test_solution_never_below_line_of_sight() {
        let query = bench_query();

        for path_kind in [PathKind::Short, PathKind::Long].iter() {
            let solution = solve(&query, *path_kind).unwrap();
            assert!(solution.angle_deg >= min_theta_deg(&query));
        }
    }
}
