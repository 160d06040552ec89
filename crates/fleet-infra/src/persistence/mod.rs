//! Persistence implementations
//!
//! File-based and in-memory implementations of the repository traits.

mod file_dead_letter_repo;
mod file_driver_score_repo;
mod file_violation_repo;
mod json_file;
mod memory;

pub use file_dead_letter_repo::FileDeadLetterRepository;
pub use file_driver_score_repo::FileDriverScoreRepository;
pub use file_violation_repo::FileViolationRepository;
pub use memory::{MemoryDeadLetterRepository, MemoryDriverScoreRepository, MemoryViolationRepository};
