//! Evaluation entry points called by the tactic layer each tick.

pub mod aim;
pub mod defense;
pub mod open_position;
pub mod position;

pub use aim::{aim, aim_unbiased, AimPreference, AimResult};
pub use defense::{defend_line, defend_on_line, defend_point, DefendResult};
pub use open_position::{
    farthest, find_open_position, find_open_position_and_yield, ClaimLedger,
};
pub use position::{EvaluationPosition, Scorer};
