//! Sampling position optimizer with frame-to-frame hysteresis
//!
//! [`EvaluationPosition`] keeps one committed answer between ticks and
//! re-derives it each update from a small candidate pool: externally staged
//! points, the carried previous answer, and fresh samples from the region.
//! The previous answer is only displaced by a candidate that beats its
//! refreshed score by strictly more than the hysteresis margin, so the
//! committed point stays put under evaluation noise.

use nalgebra::Point2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::error::{ConfigError, Result};
use crate::region::Region;
use crate::world::World;

/// Candidate pool size per update.
pub const CANDIDATE_COUNT: usize = 10;

/// Pluggable position scoring.
///
/// Must be deterministic for a fixed input. The auxiliary angle is carried
/// through unchanged for the caller (e.g. the facing to adopt at the point);
/// `None` rejects the candidate outright.
pub trait Scorer {
    fn score(&self, world: &World, p: Point2<f32>, mask: u32) -> Option<(f32, f32)>;
}

#[derive(Debug, Clone, Copy)]
struct Chosen {
    point: Point2<f32>,
    angle: f32,
    score: f32,
}

/// Hysteretic sampling optimizer over a region.
///
/// The region and scorer are borrowed per update, so one optimizer instance
/// can serve a role whose region definition changes between plays. State is
/// per-robot-per-role and lives as long as the role assignment.
#[derive(Debug, Clone)]
pub struct EvaluationPosition {
    candidate_count: usize,
    hysteresis_margin: f32,
    rng: ChaCha8Rng,
    staged: Vec<Point2<f32>>,
    last_updated: f32,
    chosen: Option<Chosen>,
}

impl EvaluationPosition {
    /// `hysteresis_margin` is the score improvement a challenger must exceed
    /// strictly; the seed fixes the sampling sequence for reproducible runs.
    pub fn new(candidate_count: usize, hysteresis_margin: f32, seed: u64) -> Result<Self> {
        if candidate_count == 0 {
            return Err(ConfigError::InvalidCandidateCount { count: candidate_count });
        }
        Ok(Self {
            candidate_count,
            hysteresis_margin,
            rng: ChaCha8Rng::seed_from_u64(seed),
            staged: Vec::new(),
            last_updated: f32::NEG_INFINITY,
            chosen: None,
        })
    }

    /// Default-sized pool.
    pub fn with_margin(hysteresis_margin: f32, seed: u64) -> Self {
        Self {
            candidate_count: CANDIDATE_COUNT,
            hysteresis_margin,
            rng: ChaCha8Rng::seed_from_u64(seed),
            staged: Vec::new(),
            last_updated: f32::NEG_INFINITY,
            chosen: None,
        }
    }

    /// Stage a candidate for the next update.
    ///
    /// Deduplicated against already-staged points by exact equality; the
    /// committed choice is unaffected until `update` runs.
    pub fn add_point(&mut self, p: Point2<f32>) {
        if !self.staged.contains(&p) {
            self.staged.push(p);
        }
    }

    /// Re-evaluate the candidate pool against the current world.
    ///
    /// A call with non-increasing world time is a no-op: the snapshot has not
    /// advanced, so re-sampling could only add jitter.
    pub fn update(&mut self, world: &World, region: &Region, scorer: &dyn Scorer, mask: u32) {
        if world.time <= self.last_updated {
            return;
        }
        self.last_updated = world.time;

        let mut candidates: Vec<Point2<f32>> = Vec::with_capacity(self.candidate_count);

        // Carried previous answer, or the region center on the first run.
        // Scored first so its refreshed score is the hysteresis baseline.
        let carried = match self.chosen {
            Some(c) if region.contains(world, c.point) => c.point,
            _ => region.center(world),
        };
        candidates.push(carried);

        // Staged injections, validated against the region.
        for &p in &self.staged {
            if region.contains(world, p) && !candidates.contains(&p) {
                candidates.push(p);
            }
        }
        self.staged.clear();

        while candidates.len() < self.candidate_count {
            candidates.push(region.sample(world, &mut self.rng));
        }

        let carried_eval = scorer
            .score(world, carried, mask)
            .map(|(score, angle)| Chosen { point: carried, angle, score });

        let challenger = candidates[1..]
            .iter()
            .filter_map(|&p| {
                scorer
                    .score(world, p, mask)
                    .map(|(score, angle)| Chosen { point: p, angle, score })
            })
            .max_by(|a, b| a.score.total_cmp(&b.score));

        self.chosen = match (carried_eval, challenger) {
            (Some(held), Some(new)) => {
                if new.score > held.score + self.hysteresis_margin {
                    trace!(held = held.score, new = new.score, "position switched");
                    Some(new)
                } else {
                    Some(held)
                }
            }
            (held, new) => held.or(new),
        };
    }

    /// The committed point; `None` before the first successful update.
    pub fn point(&self) -> Option<Point2<f32>> {
        self.chosen.map(|c| c.point)
    }

    /// Auxiliary scorer output at the committed point.
    pub fn angle(&self) -> Option<f32> {
        self.chosen.map(|c| c.angle)
    }

    pub fn score(&self) -> Option<f32> {
        self.chosen.map(|c| c.score)
    }
}
