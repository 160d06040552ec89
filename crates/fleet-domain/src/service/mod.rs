//! Domain services

pub mod classifier;
pub mod fingerprint;
pub mod rule_evaluator;
pub mod scoring;

pub use classifier::points_for;
pub use fingerprint::fingerprint;
pub use rule_evaluator::{evaluate, evaluate_at, RULES};
pub use scoring::{compute_standing, window_start, DEFAULT_WINDOW_DAYS};
