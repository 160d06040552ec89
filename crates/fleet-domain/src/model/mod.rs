//! Domain model types

pub mod rule;
pub mod standing;

pub use rule::{Condition, Rule, Threshold};
pub use standing::ScoreStanding;
