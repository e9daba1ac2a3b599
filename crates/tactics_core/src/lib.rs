//! # tactics_core - Tactical Geometry Core for Multi-Robot Soccer
//!
//! This library computes where a robot should stand or move each control
//! tick: aiming through the widest unobstructed angular corridor, defending
//! a goal line or point against a moving ball, and finding open space, with
//! other robots and field structures modeled as dynamic obstacles.
//!
//! ## Features
//! - Deterministic evaluation (seeded sampling, fixed scan orders)
//! - Allocation-light per-tick queries over a fixed-capacity obstacle set
//! - Frame-to-frame hysteresis so committed answers do not jitter
//! - serde-friendly region/coordinate descriptions from the play layer

// Game evaluation APIs often require many parameters for masks, bands, etc.
#![allow(clippy::too_many_arguments)]

pub mod error;
pub mod evaluation;
pub mod obstacle;
pub mod region;
pub mod world;

// Re-export the per-tick entry points
pub use evaluation::{
    aim, aim_unbiased, defend_line, defend_on_line, defend_point, farthest,
    find_open_position, find_open_position_and_yield, AimPreference, AimResult, ClaimLedger,
    DefendResult, EvaluationPosition, Scorer,
};

pub use error::{ConfigError, Result};
pub use obstacle::{obs_mask, Obstacle, ObstacleSet, ObstacleShape, MAX_OBSTACLES};
pub use region::{CoordFrame, Coordinate, Region};
pub use world::{BallState, FieldSide, InterceptEstimate, Possession, RobotState, World};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
