//! Angular-aperture aiming search
//!
//! Given an origin (usually the ball), two vectors spanning a target arc
//! (usually the goal mouth) and an obstacle mask, find the direction with the
//! widest angularly unobstructed corridor. Every active obstacle projects to
//! an occluded sub-interval of the arc; the answer is the widest gap in the
//! complement, with optional preferred-direction hysteresis to damp
//! frame-to-frame oscillation between near-equal windows.

use nalgebra::{Point2, Vector2};
use tracing::trace;

use crate::obstacle::ObstacleShape;
use crate::world::World;

/// Preferred direction carried over from the previous tick.
#[derive(Debug, Clone, Copy)]
pub struct AimPreference {
    /// Previously chosen aim point.
    pub point: Point2<f32>,
    /// Keep the preferred window unless another is clear by more than this
    /// angle (rad).
    pub amount: f32,
}

/// A clear aiming corridor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimResult {
    /// Point on the target arc to aim at.
    pub target: Point2<f32>,
    /// Angular half-width of the chosen corridor (rad).
    pub tolerance: f32,
}

/// Widest unobstructed direction within the arc `[r1, r2]` seen from
/// `origin`.
///
/// Guaranteed to succeed with mask 0: the whole arc is one gap and the
/// midpoint is returned with tolerance equal to half the arc's angular span.
/// Returns `None` only when every sub-interval is occluded; the caller must
/// treat that as "no aim point" and hold position or escalate.
pub fn aim(
    world: &World,
    origin: Point2<f32>,
    r1: Vector2<f32>,
    r2: Vector2<f32>,
    mask: u32,
    pref: Option<AimPreference>,
) -> Option<AimResult> {
    let (mut v1, mut v2) = (r1, r2);
    let mut span = wrap_pi(angle_of(v2) - angle_of(v1));
    if span < 0.0 {
        std::mem::swap(&mut v1, &mut v2);
        span = -span;
    }
    let a1 = angle_of(v1);
    if span <= 0.0 {
        return None;
    }

    // Obstacles farther than the arc cannot occlude it.
    let reach = v1.norm().max(v2.norm());

    let mut occluded: Vec<(f32, f32)> = Vec::new();
    for (_, obs) in world.obs.active(mask) {
        project_occlusion(obs.shape, obs.center, origin, a1, span, reach, &mut occluded);
    }

    let gaps = free_intervals(span, &mut occluded);
    if gaps.is_empty() {
        return None;
    }

    let best = gaps
        .iter()
        .copied()
        .max_by(|a, b| width(*a).total_cmp(&width(*b)))?;

    // Hysteresis: stay in the window holding the preferred direction unless
    // the best window beats it by more than the bias.
    let (gap, theta) = match pref {
        Some(p) if p.amount >= 0.0 => {
            let pc = wrap_pi(angle_of(p.point - origin) - a1).clamp(0.0, span);
            let near = gaps
                .iter()
                .copied()
                .min_by(|a, b| gap_distance(*a, pc).total_cmp(&gap_distance(*b, pc)))
                .unwrap_or(best);
            if width(near) >= width(best) - p.amount {
                (near, pc.clamp(near.0, near.1))
            } else {
                (best, mid(best))
            }
        }
        _ => (best, mid(best)),
    };

    let tolerance = (theta - gap.0).min(gap.1 - theta);
    let dir = Vector2::new((a1 + theta).cos(), (a1 + theta).sin());
    let target = ray_arc_point(origin, dir, origin + v1, origin + v2);

    trace!(
        theta,
        tolerance,
        gaps = gaps.len(),
        "aim corridor selected"
    );

    Some(AimResult { target, tolerance })
}

/// Convenience form without a carried preference: ties resolve to the widest
/// window's midpoint.
pub fn aim_unbiased(
    world: &World,
    origin: Point2<f32>,
    r1: Vector2<f32>,
    r2: Vector2<f32>,
    mask: u32,
) -> Option<AimResult> {
    aim(world, origin, r1, r2, mask, None)
}

// ============================================================================
// Angular projection
// ============================================================================

/// Append the angular interval occluded by one obstacle, as offsets from
/// `a1`, clipped to `[0, span]`.
fn project_occlusion(
    shape: ObstacleShape,
    center: Point2<f32>,
    origin: Point2<f32>,
    a1: f32,
    span: f32,
    reach: f32,
    out: &mut Vec<(f32, f32)>,
) {
    match shape {
        ObstacleShape::Circle { radius } => {
            let d = center - origin;
            let dist = d.norm();
            if dist <= radius {
                out.push((0.0, span));
                return;
            }
            if dist - radius > reach {
                return;
            }
            let half = (radius / dist).min(1.0).asin();
            push_clipped(wrap_pi(angle_of(d) - a1), half, span, out);
        }
        ObstacleShape::Rectangle { half_extents } => {
            let d = center - origin;
            if d.x.abs() <= half_extents.x && d.y.abs() <= half_extents.y {
                out.push((0.0, span));
                return;
            }
            let near = Vector2::new(
                (d.x.abs() - half_extents.x).max(0.0),
                (d.y.abs() - half_extents.y).max(0.0),
            );
            if near.norm() > reach {
                return;
            }

            // Corner extents measured against the center direction: with the
            // origin outside the rectangle every corner lies within a half
            // turn of it, so the extent never straddles the wrap cut.
            let base = angle_of(d);
            let mut lo = 0.0f32;
            let mut hi = 0.0f32;
            for sx in [-1.0f32, 1.0] {
                for sy in [-1.0f32, 1.0] {
                    let corner =
                        center + Vector2::new(sx * half_extents.x, sy * half_extents.y);
                    let c = wrap_pi(angle_of(corner - origin) - base);
                    lo = lo.min(c);
                    hi = hi.max(c);
                }
            }
            push_clipped(wrap_pi(base - a1 + (lo + hi) / 2.0), (hi - lo) / 2.0, span, out);
        }
        ObstacleShape::HalfPlane { normal } => {
            let margin = (origin - center).dot(&normal);
            if margin < 0.0 {
                out.push((0.0, span));
                return;
            }
            // Directions crossing the boundary within `reach` satisfy
            // cos(theta - angle(-normal)) > margin / reach.
            let half = (margin / reach).clamp(-1.0, 1.0).acos();
            if half > 0.0 {
                push_clipped(wrap_pi(angle_of(-normal) - a1), half, span, out);
            }
        }
    }
}

/// Clip `[center - half, center + half]` (offset angles) to `[0, span]`,
/// considering the 2π-shifted copies so intervals near the wrap point clip
/// correctly.
fn push_clipped(center: f32, half: f32, span: f32, out: &mut Vec<(f32, f32)>) {
    use std::f32::consts::TAU;
    for shift in [-TAU, 0.0, TAU] {
        let lo = (center + shift - half).max(0.0);
        let hi = (center + shift + half).min(span);
        if lo < hi {
            out.push((lo, hi));
        }
    }
}

/// Complement of the merged occlusions within `[0, span]`.
fn free_intervals(span: f32, occluded: &mut [(f32, f32)]) -> Vec<(f32, f32)> {
    occluded.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut gaps = Vec::new();
    let mut cursor = 0.0f32;
    for &(lo, hi) in occluded.iter() {
        if lo > cursor {
            gaps.push((cursor, lo));
        }
        cursor = cursor.max(hi);
    }
    if cursor < span {
        gaps.push((cursor, span));
    }
    gaps
}

// ============================================================================
// Small helpers
// ============================================================================

fn angle_of(v: Vector2<f32>) -> f32 {
    v.y.atan2(v.x)
}

/// Wrap to (-π, π].
fn wrap_pi(a: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let mut a = a % TAU;
    if a <= -PI {
        a += TAU;
    } else if a > PI {
        a -= TAU;
    }
    a
}

fn width(g: (f32, f32)) -> f32 {
    g.1 - g.0
}

fn mid(g: (f32, f32)) -> f32 {
    (g.0 + g.1) / 2.0
}

/// Distance from angle `t` to the gap (0 when inside).
fn gap_distance(g: (f32, f32), t: f32) -> f32 {
    if t < g.0 {
        g.0 - t
    } else if t > g.1 {
        t - g.1
    } else {
        0.0
    }
}

/// Intersection of the ray `origin + t * dir` with the arc chord `a`..`b`;
/// falls back to a point at the mean arc radius if the ray grazes past an
/// endpoint numerically.
fn ray_arc_point(
    origin: Point2<f32>,
    dir: Vector2<f32>,
    a: Point2<f32>,
    b: Point2<f32>,
) -> Point2<f32> {
    let seg = b - a;
    let denom = dir.x * seg.y - dir.y * seg.x;
    if denom.abs() > f32::EPSILON {
        let w = a - origin;
        let t = (w.x * seg.y - w.y * seg.x) / denom;
        let s = (w.x * dir.y - w.y * dir.x) / -denom;
        if t > 0.0 && (-0.01..=1.01).contains(&s) {
            return origin + dir * t;
        }
    }
    let mean_radius = ((a - origin).norm() + (b - origin).norm()) / 2.0;
    origin + dir * mean_radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacle::obs_mask;
    use crate::world::BallState;
    use std::f32::consts::FRAC_PI_2;

    fn world() -> World {
        World::new(1.0, BallState::stationary(0.0, 0.0))
    }

    /// Goal mouth at x = 4, from y = -1 to y = 1, seen from the origin.
    fn goal_arc() -> (Vector2<f32>, Vector2<f32>) {
        (Vector2::new(4.0, -1.0), Vector2::new(4.0, 1.0))
    }

    #[test]
    fn mask_zero_returns_arc_midpoint() {
        let w = world();
        let (r1, r2) = goal_arc();
        let res = aim_unbiased(&w, Point2::origin(), r1, r2, obs_mask::NOTHING).unwrap();

        let half_span = (1.0f32 / 4.0).atan();
        assert!((res.tolerance - half_span).abs() < 1e-5);
        // Midpoint of a symmetric arc is straight ahead.
        assert!((res.target - Point2::new(4.0, 0.0)).norm() < 1e-4);
    }

    #[test]
    fn mask_zero_never_fails_even_inside_an_obstacle() {
        let mut w = world();
        w.obs.add_circle(0.0, 0.0, 10.0, 0.0, 0.0, obs_mask::EVERYTHING);
        let (r1, r2) = goal_arc();
        assert!(aim_unbiased(&w, Point2::origin(), r1, r2, obs_mask::NOTHING).is_some());
    }

    #[test]
    fn single_blocker_yields_wider_remaining_window() {
        let mut w = world();
        // Blocker below center: upper window is wider.
        w.obs.add_circle(2.0, -0.25, 0.2, 0.0, 0.0, obs_mask::OPPONENT);

        let (r1, r2) = goal_arc();
        let res = aim_unbiased(&w, Point2::origin(), r1, r2, obs_mask::OPPONENT).unwrap();
        assert!(res.target.y > 0.0, "expected the upper window, got {:?}", res.target);

        // Tolerance equals half the remaining window: from the blocker's
        // upper tangent to the top of the arc.
        let blocker_top = (-0.25f32 / 2.0).atan() + (0.2f32 / (2.0f32.powi(2) + 0.25f32.powi(2)).sqrt()).asin();
        let arc_top = (1.0f32 / 4.0).atan();
        let expected = (arc_top - blocker_top) / 2.0;
        assert!(
            (res.tolerance - expected).abs() < 1e-3,
            "tolerance {} expected {}",
            res.tolerance,
            expected
        );
    }

    #[test]
    fn fully_blocked_arc_fails() {
        let mut w = world();
        w.obs.add_circle(2.0, 0.0, 1.8, 0.0, 0.0, obs_mask::OPPONENT);
        let (r1, r2) = goal_arc();
        assert!(aim_unbiased(&w, Point2::origin(), r1, r2, obs_mask::OPPONENT).is_none());
    }

    #[test]
    fn obstacle_behind_the_arc_does_not_occlude() {
        let mut w = world();
        w.obs.add_circle(20.0, 0.0, 1.0, 0.0, 0.0, obs_mask::OPPONENT);
        let (r1, r2) = goal_arc();
        let res = aim_unbiased(&w, Point2::origin(), r1, r2, obs_mask::OPPONENT).unwrap();
        assert!((res.target - Point2::new(4.0, 0.0)).norm() < 1e-4);
    }

    #[test]
    fn arc_order_does_not_matter() {
        let w = world();
        let (r1, r2) = goal_arc();
        let a = aim_unbiased(&w, Point2::origin(), r1, r2, obs_mask::NOTHING).unwrap();
        let b = aim_unbiased(&w, Point2::origin(), r2, r1, obs_mask::NOTHING).unwrap();
        assert!((a.target - b.target).norm() < 1e-5);
        assert!((a.tolerance - b.tolerance).abs() < 1e-6);
    }

    #[test]
    fn preference_holds_a_near_equal_window() {
        let mut w = world();
        // Slightly off-center blocker: lower window marginally wider.
        w.obs.add_circle(2.0, 0.02, 0.15, 0.0, 0.0, obs_mask::OPPONENT);
        let (r1, r2) = goal_arc();

        let unbiased =
            aim_unbiased(&w, Point2::origin(), r1, r2, obs_mask::OPPONENT).unwrap();
        assert!(unbiased.target.y < 0.0);

        // Preferring the upper window with a generous bias keeps it.
        let pref = AimPreference { point: Point2::new(4.0, 0.8), amount: 0.5 };
        let biased =
            aim(&w, Point2::origin(), r1, r2, obs_mask::OPPONENT, Some(pref)).unwrap();
        assert!(biased.target.y > 0.0);

        // Zero bias switches to the genuinely wider window.
        let strict = AimPreference { point: Point2::new(4.0, 0.8), amount: 0.0 };
        let unswayed =
            aim(&w, Point2::origin(), r1, r2, obs_mask::OPPONENT, Some(strict)).unwrap();
        assert!(unswayed.target.y < 0.0);
    }

    #[test]
    fn rectangle_behind_the_aimer_does_not_occlude() {
        let mut w = world();
        // Defense area directly behind the origin, opposite the arc.
        w.obs.add_rectangle(-3.0, 0.0, 2.0, 2.0, obs_mask::OUR_DEFENSE_AREA);

        let (r1, r2) = goal_arc();
        let res =
            aim_unbiased(&w, Point2::origin(), r1, r2, obs_mask::OUR_DEFENSE_AREA).unwrap();
        // The arc is untouched: full midpoint and half-span tolerance.
        assert!((res.target - Point2::new(4.0, 0.0)).norm() < 1e-4);
        assert!((res.tolerance - (1.0f32 / 4.0).atan()).abs() < 1e-5);
    }

    #[test]
    fn rectangle_blocker_occludes_its_angular_extent() {
        let mut w = world();
        // Box covering the lower part of the arc: the answer moves up.
        w.obs.add_rectangle(2.0, -0.4, 0.4, 0.4, obs_mask::OPPONENT);

        let (r1, r2) = goal_arc();
        let res = aim_unbiased(&w, Point2::origin(), r1, r2, obs_mask::OPPONENT).unwrap();
        assert!(res.target.y > 0.0, "expected the upper window, got {:?}", res.target);
        assert!(res.tolerance < (1.0f32 / 4.0).atan());
    }

    #[test]
    fn half_plane_blocks_its_side_of_the_arc() {
        let mut w = world();
        // Boundary y = 0, free side +y: the lower half of the arc is gone.
        w.obs.add_half_plane(0.0, -0.2, 0.0, 1.0, obs_mask::WALLS);
        let (r1, r2) = goal_arc();
        let res = aim_unbiased(&w, Point2::origin(), r1, r2, obs_mask::WALLS).unwrap();
        assert!(res.target.y > 0.0);
    }

    #[test]
    fn wide_arc_midpoint_tolerance_is_quarter_turn() {
        let w = world();
        // Quarter-circle arc from +x to +y.
        let res = aim_unbiased(
            &w,
            Point2::origin(),
            Vector2::new(3.0, 0.0),
            Vector2::new(0.0, 3.0),
            obs_mask::NOTHING,
        )
        .unwrap();
        assert!((res.tolerance - FRAC_PI_2 / 2.0).abs() < 1e-5);
    }

    #[cfg(all(test, feature = "proptest"))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: with mask 0 the search always succeeds, and the
            /// tolerance is half the arc's angular span.
            #[test]
            fn prop_mask_zero_midpoint(
                ax in -3.0f32..3.0f32,
                ay in -3.0f32..3.0f32,
                spread in 0.1f32..1.2f32,
                len in 1.0f32..6.0f32,
            ) {
                let w = world();
                let base = ay.atan2(ax);
                let r1 = Vector2::new((base - spread).cos(), (base - spread).sin()) * len;
                let r2 = Vector2::new((base + spread).cos(), (base + spread).sin()) * len;

                let res = aim_unbiased(&w, Point2::origin(), r1, r2, 0);
                prop_assert!(res.is_some());
                let res = res.unwrap();
                prop_assert!((res.tolerance - spread).abs() < 1e-3);
            }
        }
    }
}
