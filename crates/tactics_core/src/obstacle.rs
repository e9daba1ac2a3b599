//! Obstacle model
//!
//! Geometric primitives (axis-aligned rectangles, circles, half-planes) that
//! the evaluation engine treats as dynamic obstacles. Each obstacle carries an
//! enable mask; a query only considers obstacles whose mask intersects the
//! query mask. The set is rebuilt from the world snapshot once per control
//! tick and is read-only afterwards.

use nalgebra::{Point2, Vector2};

// ============================================================================
// Constants
// ============================================================================

/// Maximum obstacles in a set: robots, ball, defense areas, walls.
pub const MAX_OBSTACLES: usize = 24;

/// Distance beyond which an obstacle contributes no repulsion (m).
pub const REPULSE_INFLUENCE_M: f32 = 1.0;

/// Lookahead applied to a moving obstacle when computing repulsion (s).
pub const REPULSE_LOOKAHEAD_S: f32 = 0.25;

/// Named obstacle mask bits.
///
/// The tactic layer assigns one bit per obstacle class when it rebuilds the
/// set each tick. Mask 0 on a query means "ignore all obstacles".
pub mod obs_mask {
    pub const TEAMMATE: u32 = 1 << 0;
    pub const OPPONENT: u32 = 1 << 1;
    pub const BALL: u32 = 1 << 2;
    pub const OUR_DEFENSE_AREA: u32 = 1 << 3;
    pub const THEIR_DEFENSE_AREA: u32 = 1 << 4;
    pub const WALLS: u32 = 1 << 5;

    pub const EVERYTHING: u32 = u32::MAX;
    pub const NOTHING: u32 = 0;
}

// ============================================================================
// Obstacle
// ============================================================================

/// Shape of a single obstacle.
///
/// Extents are half-sizes: a rectangle stores half-width/half-height, a
/// circle its radius, a half-plane the unit normal of its boundary (points
/// on the normal side are free, the other side is blocked).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObstacleShape {
    Rectangle { half_extents: Vector2<f32> },
    Circle { radius: f32 },
    HalfPlane { normal: Vector2<f32> },
}

impl Default for ObstacleShape {
    fn default() -> Self {
        ObstacleShape::Circle { radius: 0.0 }
    }
}

/// One obstacle: shape, enable mask, center and velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub shape: ObstacleShape,
    pub mask: u32,
    pub center: Point2<f32>,
    pub vel: Vector2<f32>,
}

impl Default for Obstacle {
    fn default() -> Self {
        Self {
            shape: ObstacleShape::default(),
            mask: 0,
            center: Point2::origin(),
            vel: Vector2::zeros(),
        }
    }
}

impl Obstacle {
    /// Signed clearance from `p` to the obstacle boundary.
    ///
    /// Positive outside, negative inside. Used both as the blocking test
    /// (`margin < 0`) and as the decay input for repulsion.
    pub fn margin(&self, p: Point2<f32>) -> f32 {
        let d = p - self.center;
        match self.shape {
            ObstacleShape::Rectangle { half_extents } => {
                let dx = d.x.abs() - half_extents.x;
                let dy = d.y.abs() - half_extents.y;
                if dx > 0.0 || dy > 0.0 {
                    // Outside: distance to the nearest face or corner.
                    let ox = dx.max(0.0);
                    let oy = dy.max(0.0);
                    (ox * ox + oy * oy).sqrt()
                } else {
                    // Inside: negative, distance to the nearest face.
                    dx.max(dy)
                }
            }
            ObstacleShape::Circle { radius } => d.norm() - radius,
            ObstacleShape::HalfPlane { normal } => d.dot(&normal),
        }
    }

    /// Point on the obstacle boundary closest to `p`.
    pub fn closest_point(&self, p: Point2<f32>) -> Point2<f32> {
        match self.shape {
            ObstacleShape::Rectangle { half_extents } => {
                let d = p - self.center;
                let cx = d.x.clamp(-half_extents.x, half_extents.x);
                let cy = d.y.clamp(-half_extents.y, half_extents.y);
                self.center + Vector2::new(cx, cy)
            }
            ObstacleShape::Circle { radius } => {
                let d = p - self.center;
                let n = d.norm();
                if n > f32::EPSILON {
                    self.center + d * (radius / n)
                } else {
                    self.center + Vector2::new(radius, 0.0)
                }
            }
            ObstacleShape::HalfPlane { normal } => {
                let d = p - self.center;
                p - normal * d.dot(&normal)
            }
        }
    }

    /// True iff `p` lies inside the obstacle.
    pub fn blocks(&self, p: Point2<f32>) -> bool {
        self.margin(p) < 0.0
    }

    /// True iff the segment `p0`..`p1` passes through the obstacle.
    pub fn blocks_segment(&self, p0: Point2<f32>, p1: Point2<f32>) -> bool {
        match self.shape {
            ObstacleShape::Rectangle { half_extents } => {
                segment_hits_aabb(p0, p1, self.center, half_extents)
            }
            ObstacleShape::Circle { radius } => {
                distance_to_segment(self.center, p0, p1) < radius
            }
            ObstacleShape::HalfPlane { .. } => {
                // Blocked if either endpoint is on the blocked side; a segment
                // with both endpoints on the free side never crosses.
                self.blocks(p0) || self.blocks(p1)
            }
        }
    }

    /// Predicted center after `dt` seconds of constant-velocity motion.
    pub fn center_at(&self, dt: f32) -> Point2<f32> {
        self.center + self.vel * dt
    }

    /// Repulsion vector at `p`: points away from the obstacle, magnitude 1 at
    /// contact decaying linearly to 0 at [`REPULSE_INFLUENCE_M`].
    ///
    /// Moving obstacles repel from a short velocity lookahead of their center
    /// so that motion control drifts behind them rather than into their path.
    pub fn repulse(&self, p: Point2<f32>) -> Vector2<f32> {
        let mut look = *self;
        look.center = self.center_at(REPULSE_LOOKAHEAD_S);

        let m = look.margin(p);
        if m >= REPULSE_INFLUENCE_M {
            return Vector2::zeros();
        }
        let magnitude = (1.0 - m / REPULSE_INFLUENCE_M).min(1.0);

        let dir = match look.shape {
            ObstacleShape::HalfPlane { normal } => normal,
            _ => {
                let away = p - look.closest_point(p);
                let n = away.norm();
                if n > f32::EPSILON {
                    let sign = if m < 0.0 { -1.0 } else { 1.0 };
                    away * (sign / n)
                } else {
                    // Degenerate: at the exact center, push along +x.
                    Vector2::new(1.0, 0.0)
                }
            }
        };

        dir * magnitude
    }
}

// ============================================================================
// ObstacleSet
// ============================================================================

/// Fixed-capacity, insertion-ordered obstacle collection.
///
/// Rebuilt once per control tick, then queried read-only. Insertion order is
/// the check order but carries no priority. Exceeding [`MAX_OBSTACLES`] is a
/// configuration error in the tactic layer, not a runtime condition; `add`
/// asserts.
#[derive(Debug, Clone, Copy)]
pub struct ObstacleSet {
    obs: [Obstacle; MAX_OBSTACLES],
    num: usize,
    /// Default mask applied by the `add_*` helpers.
    current_mask: u32,
}

impl Default for ObstacleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ObstacleSet {
    pub fn new() -> Self {
        Self { obs: [Obstacle::default(); MAX_OBSTACLES], num: 0, current_mask: 0 }
    }

    pub fn num(&self) -> usize {
        self.num
    }

    pub fn clear(&mut self) {
        self.num = 0;
    }

    /// Default mask used by subsequent `add_*` calls.
    pub fn set_mask(&mut self, mask: u32) {
        self.current_mask = mask;
    }

    pub fn get(&self, id: usize) -> Option<&Obstacle> {
        self.obs[..self.num].get(id)
    }

    /// Obstacles whose mask intersects `mask`, with their index.
    pub fn active(&self, mask: u32) -> impl Iterator<Item = (usize, &Obstacle)> {
        self.obs[..self.num]
            .iter()
            .enumerate()
            .filter(move |(_, o)| o.mask & mask != 0)
    }

    pub fn add(&mut self, obstacle: Obstacle) {
        assert!(self.num < MAX_OBSTACLES, "obstacle set capacity exceeded");
        self.obs[self.num] = obstacle;
        self.num += 1;
    }

    /// Axis-aligned rectangle of width `w` and height `h` centered at (cx, cy).
    pub fn add_rectangle(&mut self, cx: f32, cy: f32, w: f32, h: f32, mask: u32) {
        self.add(Obstacle {
            shape: ObstacleShape::Rectangle { half_extents: Vector2::new(w / 2.0, h / 2.0) },
            mask,
            center: Point2::new(cx, cy),
            vel: Vector2::zeros(),
        });
    }

    /// Circle at (x, y) moving with velocity (vx, vy).
    pub fn add_circle(&mut self, x: f32, y: f32, radius: f32, vx: f32, vy: f32, mask: u32) {
        self.add(Obstacle {
            shape: ObstacleShape::Circle { radius },
            mask,
            center: Point2::new(x, y),
            vel: Vector2::new(vx, vy),
        });
    }

    /// Half-plane through (x, y); the side the unit normal (nx, ny) points to
    /// is free, the other side blocked.
    pub fn add_half_plane(&mut self, x: f32, y: f32, nx: f32, ny: f32, mask: u32) {
        let n = (nx * nx + ny * ny).sqrt();
        assert!(n > f32::EPSILON, "half-plane normal must be non-zero");
        self.add(Obstacle {
            shape: ObstacleShape::HalfPlane { normal: Vector2::new(nx / n, ny / n) },
            mask,
            center: Point2::new(x, y),
            vel: Vector2::zeros(),
        });
    }

    /// Circle with the current default mask.
    pub fn add_robot(&mut self, pos: Point2<f32>, vel: Vector2<f32>, radius: f32) {
        let mask = self.current_mask;
        self.add_circle(pos.x, pos.y, radius, vel.x, vel.y, mask);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// True iff any obstacle active under `mask` contains `p`.
    pub fn check(&self, p: Point2<f32>, mask: u32) -> bool {
        self.check_id(p, mask).is_some()
    }

    /// Like [`check`](Self::check) but reports the first blocking obstacle.
    pub fn check_id(&self, p: Point2<f32>, mask: u32) -> Option<usize> {
        self.active(mask).find(|(_, o)| o.blocks(p)).map(|(i, _)| i)
    }

    /// True iff any active obstacle blocks the segment `p0`..`p1`.
    pub fn check_segment(&self, p0: Point2<f32>, p1: Point2<f32>, mask: u32) -> bool {
        self.check_segment_id(p0, p1, mask).is_some()
    }

    /// Segment check reporting the first blocking obstacle.
    pub fn check_segment_id(&self, p0: Point2<f32>, p1: Point2<f32>, mask: u32) -> Option<usize> {
        self.active(mask)
            .find(|(_, o)| o.blocks_segment(p0, p1))
            .map(|(i, _)| i)
    }

    /// Smallest margin over all active obstacles; `+inf` when none is active.
    ///
    /// A point is clear by `r` iff `clearance(p, mask) >= r`.
    pub fn clearance(&self, p: Point2<f32>, mask: u32) -> f32 {
        self.active(mask)
            .map(|(_, o)| o.margin(p))
            .fold(f32::INFINITY, f32::min)
    }

    /// Sum of all active obstacles' repulsion contributions at `p`.
    ///
    /// Used as a smoothing term by motion control, not by the searches.
    pub fn repulse(&self, p: Point2<f32>, mask: u32) -> Vector2<f32> {
        self.active(mask)
            .map(|(_, o)| o.repulse(p))
            .fold(Vector2::zeros(), |acc, v| acc + v)
    }
}

// ============================================================================
// Segment helpers
// ============================================================================

/// Shortest distance from `p` to the segment `a`..`b`.
pub(crate) fn distance_to_segment(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < f32::EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Slab test: does the segment `p0`..`p1` hit the box `center ± half_extents`?
fn segment_hits_aabb(
    p0: Point2<f32>,
    p1: Point2<f32>,
    center: Point2<f32>,
    half_extents: Vector2<f32>,
) -> bool {
    let d = p1 - p0;
    let mut t_min = 0.0f32;
    let mut t_max = 1.0f32;

    for axis in 0..2 {
        let start = p0[axis] - center[axis];
        let dir = d[axis];
        let ext = half_extents[axis];

        if dir.abs() < f32::EPSILON {
            if start.abs() > ext {
                return false;
            }
        } else {
            let mut t1 = (-ext - start) / dir;
            let mut t2 = (ext - start) / dir;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return false;
            }
        }
    }

    true
}
