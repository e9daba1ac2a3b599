//! Regions and frame-relative coordinates
//!
//! A [`Region`] is the sampling domain of a position search: a disc or a
//! rounded rectangle spanned between two endpoints. Regions come from the
//! external play-description layer as data (serde), and the core only needs
//! three behaviors from them: `center`, `contains` and `sample`.
//!
//! Coordinates resolve against the world snapshot, so a ball-relative region
//! follows the ball from tick to tick.

use nalgebra::{Point2, Vector2};
use rand::Rng;
use rand_distr::{Distribution, UnitDisc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::world::World;

/// Rejection-sampling attempts before falling back to the region center.
const SAMPLE_ATTEMPTS: usize = 16;

// ============================================================================
// Coordinate
// ============================================================================

/// Reference frame a coordinate resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordFrame {
    /// Field frame; the offset is the position itself.
    #[default]
    Absolute,
    /// Offset from the current ball position.
    Ball,
    /// Offset from the operator-interface point, when one is set; absolute
    /// otherwise.
    Interface,
}

/// A 2D value resolvable against the world snapshot.
///
/// With `dir_only` set the offset is a direction, not a position, and frame
/// translation does not apply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub offset: Vector2<f32>,
    #[serde(default)]
    pub frame: CoordFrame,
    #[serde(default)]
    pub dir_only: bool,
}

impl Coordinate {
    pub fn absolute(x: f32, y: f32) -> Self {
        Self { offset: Vector2::new(x, y), frame: CoordFrame::Absolute, dir_only: false }
    }

    pub fn ball_relative(x: f32, y: f32) -> Self {
        Self { offset: Vector2::new(x, y), frame: CoordFrame::Ball, dir_only: false }
    }

    /// A direction-only coordinate, e.g. the scan direction of a directional
    /// search.
    pub fn direction_of(x: f32, y: f32) -> Self {
        Self { offset: Vector2::new(x, y), frame: CoordFrame::Absolute, dir_only: true }
    }

    /// The coordinate as a position in the field frame.
    pub fn point(&self, world: &World) -> Point2<f32> {
        let origin = match self.frame {
            CoordFrame::Absolute => Point2::origin(),
            CoordFrame::Ball => world.ball.pos,
            CoordFrame::Interface => world.interface_point.unwrap_or_else(Point2::origin),
        };
        if self.dir_only {
            // A direction has no origin; expose it anchored at the frame
            // origin so degenerate play descriptions stay usable.
            origin
        } else {
            origin + self.offset
        }
    }

    /// The coordinate as a direction; frame translation does not apply.
    pub fn direction(&self) -> Vector2<f32> {
        self.offset
    }
}

// ============================================================================
// Region
// ============================================================================

/// Sampling domain for position searches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Region {
    /// All points within `radius` of `center`.
    Disc { center: Coordinate, radius: f32 },
    /// Axis-aligned rectangle spanned by `p1`..`p2`, inflated by `radius`
    /// with rounded corners.
    RoundedRect { p1: Coordinate, p2: Coordinate, radius: f32 },
}

impl Region {
    pub fn disc(center: Coordinate, radius: f32) -> Self {
        Region::Disc { center, radius }
    }

    pub fn rounded_rect(p1: Coordinate, p2: Coordinate, radius: f32) -> Self {
        Region::RoundedRect { p1, p2, radius }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let radius = match *self {
            Region::Disc { radius, .. } => radius,
            Region::RoundedRect { radius, .. } => radius,
        };
        if radius > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::InvalidRegionRadius { radius })
        }
    }

    pub fn center(&self, world: &World) -> Point2<f32> {
        match self {
            Region::Disc { center, .. } => center.point(world),
            Region::RoundedRect { p1, p2, .. } => {
                nalgebra::center(&p1.point(world), &p2.point(world))
            }
        }
    }

    pub fn contains(&self, world: &World, p: Point2<f32>) -> bool {
        match self {
            Region::Disc { center, radius } => (p - center.point(world)).norm() <= *radius,
            Region::RoundedRect { p1, p2, radius } => {
                let (lo, hi) = corners(p1.point(world), p2.point(world));
                let cx = p.x.clamp(lo.x, hi.x);
                let cy = p.y.clamp(lo.y, hi.y);
                (p - Point2::new(cx, cy)).norm() <= *radius
            }
        }
    }

    /// Draw one point from the region's distribution.
    ///
    /// Disc sampling is exactly uniform; the rounded rectangle uses bounded
    /// rejection over its bounding box and falls back to the center if every
    /// attempt lands in a corner cutout (vanishingly rare).
    pub fn sample<R: Rng>(&self, world: &World, rng: &mut R) -> Point2<f32> {
        match self {
            Region::Disc { center, radius } => {
                let xy: [f32; 2] = UnitDisc.sample(rng);
                center.point(world) + Vector2::new(xy[0], xy[1]) * *radius
            }
            Region::RoundedRect { p1, p2, radius } => {
                let (lo, hi) = corners(p1.point(world), p2.point(world));
                for _ in 0..SAMPLE_ATTEMPTS {
                    let p = Point2::new(
                        rng.gen_range(lo.x - radius..=hi.x + radius),
                        rng.gen_range(lo.y - radius..=hi.y + radius),
                    );
                    if self.contains(world, p) {
                        return p;
                    }
                }
                self.center(world)
            }
        }
    }
}

fn corners(a: Point2<f32>, b: Point2<f32>) -> (Point2<f32>, Point2<f32>) {
    (
        Point2::new(a.x.min(b.x), a.y.min(b.y)),
        Point2::new(a.x.max(b.x), a.y.max(b.y)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::BallState;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn world() -> World {
        World::new(1.0, BallState::stationary(3.0, -2.0))
    }

    #[test]
    fn disc_contains_and_center() {
        let w = world();
        let r = Region::disc(Coordinate::absolute(1.0, 1.0), 2.0);
        assert_eq!(r.center(&w), Point2::new(1.0, 1.0));
        assert!(r.contains(&w, Point2::new(2.5, 1.0)));
        assert!(!r.contains(&w, Point2::new(3.5, 1.0)));
    }

    #[test]
    fn ball_relative_region_follows_the_ball() {
        let mut w = world();
        let r = Region::disc(Coordinate::ball_relative(1.0, 0.0), 0.5);
        assert_eq!(r.center(&w), Point2::new(4.0, -2.0));

        w.ball.pos = Point2::new(0.0, 0.0);
        assert_eq!(r.center(&w), Point2::new(1.0, 0.0));
    }

    #[test]
    fn rounded_rect_contains_core_edge_and_corner() {
        let w = world();
        let r = Region::rounded_rect(
            Coordinate::absolute(0.0, 0.0),
            Coordinate::absolute(4.0, 2.0),
            1.0,
        );
        // Inside the spanned rectangle.
        assert!(r.contains(&w, Point2::new(2.0, 1.0)));
        // Within the inflation band of an edge.
        assert!(r.contains(&w, Point2::new(2.0, 2.8)));
        // Corner cutout: axis-aligned inflation would accept this point.
        assert!(!r.contains(&w, Point2::new(4.9, 2.9)));
        // Well outside.
        assert!(!r.contains(&w, Point2::new(6.0, 1.0)));
    }

    #[test]
    fn samples_stay_inside_the_region() {
        let w = world();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let disc = Region::disc(Coordinate::absolute(-1.0, 2.0), 3.0);
        let rect = Region::rounded_rect(
            Coordinate::absolute(0.0, 0.0),
            Coordinate::absolute(5.0, -3.0),
            0.5,
        );
        for _ in 0..200 {
            assert!(disc.contains(&w, disc.sample(&w, &mut rng)));
            assert!(rect.contains(&w, rect.sample(&w, &mut rng)));
        }
    }

    #[test]
    fn sampling_is_deterministic_per_seed() {
        let w = world();
        let r = Region::disc(Coordinate::absolute(0.0, 0.0), 2.0);

        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..32 {
            assert_eq!(r.sample(&w, &mut a), r.sample(&w, &mut b));
        }
    }

    #[test]
    fn direction_only_coordinate_keeps_its_direction() {
        let w = world();
        let c = Coordinate::direction_of(0.0, -1.0);
        assert!(c.dir_only);
        assert_eq!(c.direction(), Vector2::new(0.0, -1.0));
        // A direction has no position: point() anchors at the frame origin.
        assert_eq!(c.point(&w), Point2::origin());
    }

    #[test]
    fn validate_rejects_non_positive_radius() {
        let r = Region::disc(Coordinate::absolute(0.0, 0.0), 0.0);
        assert_eq!(
            r.validate(),
            Err(ConfigError::InvalidRegionRadius { radius: 0.0 })
        );
        assert!(Region::disc(Coordinate::absolute(0.0, 0.0), 1.0)
            .validate()
            .is_ok());
    }

    #[test]
    fn region_round_trips_through_json() {
        let r = Region::rounded_rect(
            Coordinate::ball_relative(-0.5, 0.0),
            Coordinate::absolute(2.0, 1.0),
            0.35,
        );
        let json = serde_json::to_string(&r).unwrap();
        let back: Region = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
