//! World snapshot consumed by the evaluation engine
//!
//! One immutable snapshot per control tick: ball and robot kinematic state,
//! situational flags, and the obstacle set the tactic layer rebuilt for this
//! tick. The core never mutates the snapshot.
//!
//! The interception estimate (crossing point plus positional variance) is
//! normally produced by the state-estimation filter; the constant-velocity
//! fallback here keeps the core testable without it and matches how the
//! filter degrades when the ball is rolling freely.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::obstacle::ObstacleSet;

// ============================================================================
// Constants
// ============================================================================

/// Robot body radius (m).
pub const ROBOT_RADIUS_M: f32 = 0.09;

/// Clearance radius used when looking for a spot among teammates (m).
pub const TEAMMATE_EFFECTIVE_RADIUS_M: f32 = 0.25;

/// Ball speed below which no crossing is predicted (m/s).
pub const MIN_INTERCEPT_SPEED_M_PER_S: f32 = 0.1;

/// Positional variance of the ball estimate at the current tick (m^2).
pub const BALL_VAR_BASE_M2: f32 = 0.0025;

/// Variance growth per second of prediction horizon (m^2/s).
pub const BALL_VAR_RATE_M2_PER_S: f32 = 0.09;

// ============================================================================
// Snapshot types
// ============================================================================

/// Which team holds the ball this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Possession {
    OurBall,
    TheirBall,
    #[default]
    LooseBall,
}

/// Coarse field side of the ball.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FieldSide {
    OurSide,
    #[default]
    Midfield,
    TheirSide,
}

/// Kinematic state of one robot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotState {
    pub pos: Point2<f32>,
    pub vel: Vector2<f32>,
}

impl RobotState {
    pub fn stationary(x: f32, y: f32) -> Self {
        Self { pos: Point2::new(x, y), vel: Vector2::zeros() }
    }
}

/// Kinematic state of the ball.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallState {
    pub pos: Point2<f32>,
    pub vel: Vector2<f32>,
}

impl BallState {
    pub fn stationary(x: f32, y: f32) -> Self {
        Self { pos: Point2::new(x, y), vel: Vector2::zeros() }
    }

    /// Constant-velocity position `dt` seconds ahead.
    pub fn pos_at(&self, dt: f32) -> Point2<f32> {
        self.pos + self.vel * dt
    }
}

/// Predicted ball crossing: where, when, and how certain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterceptEstimate {
    pub point: Point2<f32>,
    /// Seconds from the snapshot time until the crossing.
    pub time: f32,
    /// Positional variance of the crossing point (m^2).
    pub variance: f32,
}

/// Per-tick world snapshot.
///
/// Built by the tactic layer before any evaluation call; read-only afterwards
/// (built-then-queried discipline, no query runs concurrently with a
/// mutation).
#[derive(Debug, Clone)]
pub struct World {
    /// Monotonic match time (s). Drives the staleness guards.
    pub time: f32,
    pub ball: BallState,
    pub teammates: Vec<RobotState>,
    pub opponents: Vec<RobotState>,
    pub possession: Possession,
    pub field_side: FieldSide,
    /// Operator-selected point, when the interface supplies one. Anchors
    /// interface-relative coordinates.
    pub interface_point: Option<Point2<f32>>,
    /// Obstacle set rebuilt for this tick.
    pub obs: ObstacleSet,
}

impl World {
    pub fn new(time: f32, ball: BallState) -> Self {
        Self {
            time,
            ball,
            teammates: Vec::new(),
            opponents: Vec::new(),
            possession: Possession::default(),
            field_side: FieldSide::default(),
            interface_point: None,
            obs: ObstacleSet::new(),
        }
    }

    pub fn teammate(&self, idx: usize) -> &RobotState {
        &self.teammates[idx]
    }

    /// Variance of the ball estimate `dt` seconds ahead.
    fn variance_at(dt: f32) -> f32 {
        BALL_VAR_BASE_M2 + BALL_VAR_RATE_M2_PER_S * dt
    }

    /// Predicted crossing of the ball path with the segment `g1`..`g2`.
    ///
    /// `None` when the ball is too slow or not moving toward the segment —
    /// the estimator-unavailable case, which defense blending degrades on.
    pub fn intercept_line(&self, g1: Point2<f32>, g2: Point2<f32>) -> Option<InterceptEstimate> {
        let v = self.ball.vel;
        if v.norm() < MIN_INTERCEPT_SPEED_M_PER_S {
            return None;
        }

        let seg = g2 - g1;
        let denom = cross2(v, seg);
        if denom.abs() < f32::EPSILON {
            // Ball path parallel to the segment.
            return None;
        }

        let w = g1 - self.ball.pos;
        let t = cross2(w, seg) / denom;
        let s = cross2(w, v) / denom;
        if t <= 0.0 || !(0.0..=1.0).contains(&s) {
            return None;
        }

        Some(InterceptEstimate {
            point: self.ball.pos_at(t),
            time: t,
            variance: Self::variance_at(t),
        })
    }

    /// Predicted first entry of the ball path into the circle
    /// `center ± radius`.
    pub fn intercept_circle(&self, center: Point2<f32>, radius: f32) -> Option<InterceptEstimate> {
        let v = self.ball.vel;
        if v.norm() < MIN_INTERCEPT_SPEED_M_PER_S {
            return None;
        }

        // |p0 + v t - c|^2 = r^2, smallest t > 0.
        let d = self.ball.pos - center;
        let a = v.norm_squared();
        let b = 2.0 * d.dot(&v);
        let c = d.norm_squared() - radius * radius;
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }

        let sqrt_disc = disc.sqrt();
        let t0 = (-b - sqrt_disc) / (2.0 * a);
        let t1 = (-b + sqrt_disc) / (2.0 * a);
        let t = if t0 > 0.0 {
            t0
        } else if t1 > 0.0 {
            // Ball already inside the circle: take the exit-side root.
            t1
        } else {
            return None;
        };

        Some(InterceptEstimate {
            point: self.ball.pos_at(t),
            time: t,
            variance: Self::variance_at(t),
        })
    }
}

#[inline]
fn cross2(a: Vector2<f32>, b: Vector2<f32>) -> f32 {
    a.x * b.y - a.y * b.x
}
