//! Direct open-space searches over the obstacle set
//!
//! Unlike the sampling optimizer these are deterministic geometric scans:
//! `farthest` is a directional extremal search over a bounding box,
//! `find_open_position` a line search for the first point with enough
//! clearance, and `find_open_position_and_yield` the multi-robot variant
//! where earlier callers' results are claimed and later callers must settle
//! for a different nearby point.

use nalgebra::Point2;
use tracing::trace;

use crate::region::Coordinate;
use crate::world::{World, TEAMMATE_EFFECTIVE_RADIUS_M};

/// Grid resolution per axis of the `farthest` scan.
const FARTHEST_GRID_STEPS: usize = 16;

/// Line-search step of `find_open_position` (m).
const OPEN_SEARCH_STEP_M: f32 = 0.05;

/// Extra search distance past the `toward` point (m).
const OPEN_SEARCH_OVERSHOOT_M: f32 = 1.0;

/// Point in the box `[lo, hi]` farthest along `dir` that no active obstacle
/// contains. `dir` is a direction-only coordinate from the play description.
///
/// The scan is a fixed grid in a fixed order, so ties resolve the same way
/// every tick. `None` when the whole box is blocked.
pub fn farthest(
    world: &World,
    mask: u32,
    lo: Point2<f32>,
    hi: Point2<f32>,
    dir: &Coordinate,
) -> Option<Point2<f32>> {
    let dir = dir.direction();
    let mut best: Option<(f32, Point2<f32>)> = None;
    for i in 0..=FARTHEST_GRID_STEPS {
        for j in 0..=FARTHEST_GRID_STEPS {
            let fx = i as f32 / FARTHEST_GRID_STEPS as f32;
            let fy = j as f32 / FARTHEST_GRID_STEPS as f32;
            let p = Point2::new(lo.x + (hi.x - lo.x) * fx, lo.y + (hi.y - lo.y) * fy);
            if world.obs.check(p, mask) {
                continue;
            }
            let depth = p.coords.dot(&dir);
            if best.map_or(true, |(b, _)| depth > b) {
                best = Some((depth, p));
            }
        }
    }
    best.map(|(_, p)| p)
}

/// First point from `from` toward `toward` with at least `radius` clearance
/// from every active obstacle.
///
/// `from` itself is the first candidate, so an unobstructed start returns
/// immediately. The search runs a little past `toward` before giving up.
pub fn find_open_position(
    world: &World,
    from: Point2<f32>,
    toward: Point2<f32>,
    mask: u32,
    radius: f32,
) -> Option<Point2<f32>> {
    line_search(world, from, toward, mask, radius, &[])
}

/// Per-tick record of positions already handed out, so concurrent callers
/// converge on distinct points. Call order is priority order: earlier
/// callers keep their claims, later ones yield.
#[derive(Debug, Clone, Default)]
pub struct ClaimLedger {
    claims: Vec<Point2<f32>>,
}

impl ClaimLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset at the start of each tick, before the first search.
    pub fn clear(&mut self) {
        self.claims.clear();
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

/// [`find_open_position`] that also avoids every position already claimed in
/// `ledger` this tick, and claims its own result on success.
pub fn find_open_position_and_yield(
    world: &World,
    from: Point2<f32>,
    toward: Point2<f32>,
    mask: u32,
    ledger: &mut ClaimLedger,
) -> Option<Point2<f32>> {
    let found = line_search(
        world,
        from,
        toward,
        mask,
        TEAMMATE_EFFECTIVE_RADIUS_M,
        &ledger.claims,
    )?;
    ledger.claims.push(found);
    trace!(x = found.x, y = found.y, claims = ledger.claims.len(), "open position claimed");
    Some(found)
}

/// Clearance of `p` against obstacles and claims alike; a claim counts as a
/// robot-sized circle.
fn effective_clearance(
    world: &World,
    p: Point2<f32>,
    mask: u32,
    claims: &[Point2<f32>],
) -> f32 {
    let from_claims = claims
        .iter()
        .map(|c| (p - c).norm() - TEAMMATE_EFFECTIVE_RADIUS_M)
        .fold(f32::INFINITY, f32::min);
    world.obs.clearance(p, mask).min(from_claims)
}

fn line_search(
    world: &World,
    from: Point2<f32>,
    toward: Point2<f32>,
    mask: u32,
    radius: f32,
    claims: &[Point2<f32>],
) -> Option<Point2<f32>> {
    let ray = toward - from;
    let length = ray.norm();
    if length < f32::EPSILON {
        return (effective_clearance(world, from, mask, claims) >= radius).then_some(from);
    }
    let dir = ray / length;

    let reach = length + OPEN_SEARCH_OVERSHOOT_M;
    let steps = (reach / OPEN_SEARCH_STEP_M).ceil() as usize;
    for i in 0..=steps {
        let p = from + dir * (i as f32 * OPEN_SEARCH_STEP_M).min(reach);
        if effective_clearance(world, p, mask, claims) >= radius {
            return Some(p);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacle::obs_mask;
    use crate::world::BallState;

    fn world() -> World {
        World::new(1.0, BallState::stationary(0.0, 0.0))
    }

    #[test]
    fn empty_set_returns_from_immediately() {
        let w = world();
        let from = Point2::new(1.0, -2.0);
        let got = find_open_position(&w, from, Point2::new(5.0, 3.0), obs_mask::EVERYTHING, 0.25);
        assert_eq!(got, Some(from));
    }

    #[test]
    fn blocked_start_steps_to_first_clear_point() {
        let mut w = world();
        w.obs.add_circle(0.0, 0.0, 0.3, 0.0, 0.0, obs_mask::OPPONENT);

        let got = find_open_position(
            &w,
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0),
            obs_mask::OPPONENT,
            0.2,
        )
        .unwrap();
        // First clear point: circle margin 0.3 plus the requested 0.2.
        assert!((got.x - 0.5).abs() < 1e-4, "got {:?}", got);
        assert!(w.obs.clearance(got, obs_mask::OPPONENT) >= 0.2 - 1e-5);
    }

    #[test]
    fn fully_blocked_path_fails() {
        let mut w = world();
        w.obs.add_circle(2.5, 0.0, 10.0, 0.0, 0.0, obs_mask::OPPONENT);

        let got = find_open_position(
            &w,
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0),
            obs_mask::OPPONENT,
            0.2,
        );
        assert!(got.is_none());
    }

    #[test]
    fn degenerate_direction_checks_from_only() {
        let mut w = world();
        let p = Point2::new(1.0, 1.0);
        assert_eq!(find_open_position(&w, p, p, obs_mask::EVERYTHING, 0.1), Some(p));

        w.obs.add_circle(1.0, 1.0, 0.5, 0.0, 0.0, obs_mask::OPPONENT);
        assert_eq!(find_open_position(&w, p, p, obs_mask::OPPONENT, 0.1), None);
    }

    #[test]
    fn farthest_picks_the_deepest_free_point() {
        let w = world();
        let got = farthest(
            &w,
            obs_mask::EVERYTHING,
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 4.0),
            &Coordinate::direction_of(1.0, 0.0),
        )
        .unwrap();
        // Free box: the deepest column; first row in scan order breaks the tie.
        assert_eq!(got, Point2::new(4.0, 0.0));
    }

    #[test]
    fn farthest_skips_blocked_depths() {
        let mut w = world();
        // Wall covering the right quarter of the box.
        w.obs.add_rectangle(3.75, 2.0, 1.0, 5.0, obs_mask::WALLS);

        let got = farthest(
            &w,
            obs_mask::WALLS,
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 4.0),
            &Coordinate::direction_of(1.0, 0.0),
        )
        .unwrap();
        assert!(got.x < 3.25 + 1e-4);
        assert!(!w.obs.check(got, obs_mask::WALLS));
    }

    #[test]
    fn farthest_fails_when_everything_is_blocked() {
        let mut w = world();
        w.obs.add_circle(2.0, 2.0, 10.0, 0.0, 0.0, obs_mask::OPPONENT);
        let got = farthest(
            &w,
            obs_mask::OPPONENT,
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 4.0),
            &Coordinate::direction_of(1.0, 0.0),
        );
        assert!(got.is_none());
    }

    #[test]
    fn second_caller_yields_to_the_first_claim() {
        let w = world();
        let mut ledger = ClaimLedger::new();
        let from = Point2::new(0.0, 0.0);
        let toward = Point2::new(3.0, 0.0);

        let a = find_open_position_and_yield(&w, from, toward, obs_mask::EVERYTHING, &mut ledger)
            .unwrap();
        assert_eq!(a, from);
        assert_eq!(ledger.len(), 1);

        let b = find_open_position_and_yield(&w, from, toward, obs_mask::EVERYTHING, &mut ledger)
            .unwrap();
        assert_ne!(a, b);
        // Clear of the first claim by a full robot separation.
        assert!((b - a).norm() >= 2.0 * TEAMMATE_EFFECTIVE_RADIUS_M - 1e-4);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn ledger_clear_releases_claims() {
        let w = world();
        let mut ledger = ClaimLedger::new();
        let from = Point2::new(0.0, 0.0);
        let toward = Point2::new(3.0, 0.0);

        let a = find_open_position_and_yield(&w, from, toward, obs_mask::EVERYTHING, &mut ledger)
            .unwrap();
        ledger.clear();
        assert!(ledger.is_empty());

        let b = find_open_position_and_yield(&w, from, toward, obs_mask::EVERYTHING, &mut ledger)
            .unwrap();
        assert_eq!(a, b);
    }
}
