//! Defense positioning: static coverage blended with interception
//!
//! Each entry point combines two independently computed candidates:
//!
//! - a **static** position covering the widest remaining open angle on the
//!   defended line/point (via the aiming search, so other defenders bias this
//!   robot away from angles that are already covered), and
//! - a **predictive** position at the estimated ball crossing, weighted by
//!   the estimate's positional variance.
//!
//! The two are fused with the minimum-variance linear estimator: the
//! lower-variance candidate dominates. When the predictive estimate is
//! unavailable the blend degrades to the static candidate alone; only when
//! both fail does the call fail and the caller falls back to a safe default.

use nalgebra::{Point2, Vector2};
use tracing::debug;

use crate::evaluation::aim::{aim, AimPreference};
use crate::world::{World, ROBOT_RADIUS_M};

// ============================================================================
// Constants
// ============================================================================

/// Approach horizon when no crossing time bounds the move (s).
pub const DEFAULT_APPROACH_HORIZON_S: f32 = 0.5;

/// Lower bound on the time budget used for velocity derivation (s).
pub const MIN_APPROACH_HORIZON_S: f32 = 0.1;

/// Variance scale applied to the predictive candidate when the caller asks
/// to favor interception.
pub const INTERCEPT_FAVOR: f32 = 0.5;

/// Variance assigned to the on-line static projection (m^2); the projection
/// is fully determined, so this only sets how strongly a noisy crossing
/// estimate can pull away from it.
pub const ON_LINE_STATIC_VAR_M2: f32 = 0.04;

/// Floor on the coverage tolerance when converting it to a stand-off
/// distance (rad).
const MIN_COVER_TOLERANCE: f32 = 1e-3;

// ============================================================================
// Result type
// ============================================================================

/// Where to stand, how to get there, and whether this is an active intercept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefendResult {
    pub target: Point2<f32>,
    /// Velocity that reaches `target` from the robot's current position
    /// within the available time budget.
    pub velocity: Vector2<f32>,
    /// True when this tick's behavior is "moving to intercept the ball",
    /// false when holding a static position. Callers use this to keep other
    /// robots from also converging on the ball.
    pub intercepting: bool,
}

/// One candidate position with its uncertainty.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    point: Point2<f32>,
    variance: f32,
    /// Crossing time, when the candidate comes from the interception
    /// estimate. Bounds the approach-velocity budget.
    time: Option<f32>,
}

// ============================================================================
// Blending
// ============================================================================

/// Minimum-variance linear estimate of two independent position estimates:
/// `(ps * vp + pp * vs) / (vs + vp)`, componentwise.
pub fn blend_by_variance(
    ps: Point2<f32>,
    vs: f32,
    pp: Point2<f32>,
    vp: f32,
) -> Point2<f32> {
    let sum = (vs + vp).max(f32::EPSILON);
    Point2::from((ps.coords * vp + pp.coords * vs) / sum)
}

fn fuse(
    world: &World,
    robot_idx: usize,
    dist_off_ball: f32,
    favor_intercept: bool,
    statics: Option<Candidate>,
    predictive: Option<Candidate>,
) -> Option<DefendResult> {
    let predictive = predictive.map(|mut c| {
        if favor_intercept {
            c.variance *= INTERCEPT_FAVOR;
        }
        c
    });

    let (mut target, intercepting, budget) = match (statics, predictive) {
        (Some(s), Some(p)) => {
            let target = blend_by_variance(s.point, s.variance, p.point, p.variance);
            let intercepting = p.variance < s.variance;
            debug!(
                static_var = s.variance,
                predictive_var = p.variance,
                intercepting,
                "defense blend"
            );
            let budget = if intercepting { p.time } else { None };
            (target, intercepting, budget)
        }
        (Some(s), None) => (s.point, false, None),
        (None, Some(p)) => (p.point, true, p.time),
        (None, None) => return None,
    };

    if dist_off_ball > 0.0 {
        let to_ball = world.ball.pos - target;
        let n = to_ball.norm();
        if n > f32::EPSILON {
            target += to_ball * (dist_off_ball.min(n) / n);
        }
    }

    let budget = budget
        .unwrap_or(DEFAULT_APPROACH_HORIZON_S)
        .max(MIN_APPROACH_HORIZON_S);
    let velocity = (target - world.teammate(robot_idx).pos) / budget;

    Some(DefendResult { target, velocity, intercepting })
}

// ============================================================================
// defend_line
// ============================================================================

/// Defend the line segment `g1`..`g2`, standing `distmin`..`distmax` off it.
///
/// `intercept` biases the blend toward the predictive candidate; the result
/// reports whether interception was actually chosen. `mask`/`pref` flow into
/// the static aiming search so already-covered angles repel this robot.
#[allow(clippy::too_many_arguments)]
pub fn defend_line(
    world: &World,
    robot_idx: usize,
    g1: Point2<f32>,
    g2: Point2<f32>,
    distmin: f32,
    distmax: f32,
    dist_off_ball: f32,
    intercept: bool,
    mask: u32,
    pref: Option<AimPreference>,
) -> Option<DefendResult> {
    let statics = defend_line_static(world, g1, g2, distmin, distmax, mask, pref);
    let predictive = defend_line_intercept(world, g1, g2, (distmin + distmax) / 2.0);
    fuse(world, robot_idx, dist_off_ball, intercept, statics, predictive)
}

/// Best static coverage position for the line: stand on the ray from the
/// ball through the widest open angle, close enough that the robot body
/// subtends the whole window.
fn defend_line_static(
    world: &World,
    g1: Point2<f32>,
    g2: Point2<f32>,
    distmin: f32,
    distmax: f32,
    mask: u32,
    pref: Option<AimPreference>,
) -> Option<Candidate> {
    let ball = world.ball.pos;
    let res = aim(world, ball, g1 - ball, g2 - ball, mask, pref)?;
    Some(stand_on_ray(ball, res.target, res.tolerance, distmin, distmax))
}

/// Predicted crossing, pushed `dist` off the line toward the ball side.
fn defend_line_intercept(
    world: &World,
    g1: Point2<f32>,
    g2: Point2<f32>,
    dist: f32,
) -> Option<Candidate> {
    let est = world.intercept_line(g1, g2)?;

    let seg = g2 - g1;
    let mut normal = Vector2::new(-seg.y, seg.x);
    let n = normal.norm();
    if n < f32::EPSILON {
        return None;
    }
    normal /= n;
    if (world.ball.pos - est.point).dot(&normal) < 0.0 {
        normal = -normal;
    }

    Some(Candidate {
        point: est.point + normal * dist,
        variance: est.variance,
        time: Some(est.time),
    })
}

// ============================================================================
// defend_point
// ============================================================================

/// Defend a point, standing `distmin`..`distmax` away from it.
#[allow(clippy::too_many_arguments)]
pub fn defend_point(
    world: &World,
    robot_idx: usize,
    point: Point2<f32>,
    distmin: f32,
    distmax: f32,
    dist_off_ball: f32,
    intercept: bool,
    mask: u32,
    pref: Option<AimPreference>,
) -> Option<DefendResult> {
    let statics = defend_point_static(world, point, distmin, distmax, mask, pref);
    let predictive = defend_point_intercept(world, point, (distmin + distmax) / 2.0);
    fuse(world, robot_idx, dist_off_ball, intercept, statics, predictive)
}

/// Static coverage of a point: aim across the tangent arc of the defense
/// circle, then stand on the chosen ray.
fn defend_point_static(
    world: &World,
    point: Point2<f32>,
    distmin: f32,
    distmax: f32,
    mask: u32,
    pref: Option<AimPreference>,
) -> Option<Candidate> {
    let ball = world.ball.pos;
    let to_point = point - ball;
    let dist_to_ball = to_point.norm();

    if dist_to_ball <= distmax || dist_to_ball < f32::EPSILON {
        // Ball already inside the defense circle: put the body directly on
        // the ball-point line.
        let d = ((distmin + distmax) / 2.0).min(dist_to_ball);
        let dir = if dist_to_ball > f32::EPSILON {
            -to_point / dist_to_ball
        } else {
            Vector2::new(1.0, 0.0)
        };
        return Some(Candidate {
            point: point + dir * d,
            variance: ON_LINE_STATIC_VAR_M2,
            time: None,
        });
    }

    // Tangent arc of the circle (point, distmax) seen from the ball.
    let half = (distmax / dist_to_ball).min(1.0).asin();
    let r1 = rotate(to_point, -half);
    let r2 = rotate(to_point, half);
    let res = aim(world, ball, r1, r2, mask, pref)?;

    // Pull the aim point back to the requested stand-off band around the
    // defended point.
    let away = res.target - point;
    let away_n = away.norm();
    let dir = if away_n > f32::EPSILON { away / away_n } else { -to_point / dist_to_ball };

    let on_ray = stand_on_ray(ball, res.target, res.tolerance, 0.0, f32::INFINITY);
    let d = (on_ray.point - point).norm().clamp(distmin, distmax);
    Some(Candidate { point: point + dir * d, variance: on_ray.variance, time: None })
}

/// Predicted first entry of the ball into the defense circle.
fn defend_point_intercept(world: &World, point: Point2<f32>, dist: f32) -> Option<Candidate> {
    let est = world.intercept_circle(point, dist)?;
    Some(Candidate { point: est.point, variance: est.variance, time: Some(est.time) })
}

// ============================================================================
// defend_on_line
// ============================================================================

/// Defend while constrained to the segment `p1`..`p2` itself: the static
/// candidate is the segment point nearest the ball, the predictive candidate
/// the projected crossing. No obstacle-aware coverage search here.
pub fn defend_on_line(
    world: &World,
    robot_idx: usize,
    p1: Point2<f32>,
    p2: Point2<f32>,
    intercept: bool,
) -> Option<DefendResult> {
    let statics = Some(Candidate {
        point: project_on_segment(world.ball.pos, p1, p2),
        variance: ON_LINE_STATIC_VAR_M2,
        time: None,
    });
    let predictive = world.intercept_line(p1, p2).map(|est| Candidate {
        point: project_on_segment(est.point, p1, p2),
        variance: est.variance,
        time: Some(est.time),
    });
    fuse(world, robot_idx, 0.0, intercept, statics, predictive)
}

// ============================================================================
// Helpers
// ============================================================================

/// Stand on the ray from `ball` toward `cover`, close enough to the ball
/// that the robot body subtends the open window (`tolerance`), clamped so
/// the distance from `cover` stays within `[distmin, distmax]`.
///
/// The variance is the squared lateral span the robot is responsible for:
/// wide-open windows make the static answer indeterminate, tight ones pin it
/// down.
fn stand_on_ray(
    ball: Point2<f32>,
    cover: Point2<f32>,
    tolerance: f32,
    distmin: f32,
    distmax: f32,
) -> Candidate {
    let ray = cover - ball;
    let length = ray.norm().max(f32::EPSILON);
    let dir = ray / length;

    let tol = tolerance.max(MIN_COVER_TOLERANCE);
    // Body covers the window at this distance from the ball.
    let cover_dist = (ROBOT_RADIUS_M / tol.sin()).min(length);
    // Distance from the covered point, clamped to the requested band.
    let d = (length - cover_dist).clamp(distmin, distmax.min(length));
    let point = cover - dir * d;

    let lateral = tol.tan() * (length - d).max(0.0);
    Candidate { point, variance: lateral * lateral, time: None }
}

fn project_on_segment(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> Point2<f32> {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

fn rotate(v: Vector2<f32>, angle: f32) -> Vector2<f32> {
    let (s, c) = angle.sin_cos();
    Vector2::new(c * v.x - s * v.y, s * v.x + c * v.y)
}
