//! Repository adapters for persistence layer

use std::path::PathBuf;
use std::sync::Arc;

use fleet_domain::repository::{DeadLetterRepository, DriverScoreRepository, ViolationRepository};
use fleet_infra::persistence::{
    FileDeadLetterRepository, FileDriverScoreRepository, FileViolationRepository,
    MemoryDeadLetterRepository, MemoryDriverScoreRepository, MemoryViolationRepository,
};
use fleet_types::Result;

use crate::config::Config;

/// The repositories the scoring pipeline writes to
#[derive(Clone)]
pub struct Repositories {
    pub violations: Arc<dyn ViolationRepository>,
    pub scores: Arc<dyn DriverScoreRepository>,
    pub dead_letters: Arc<dyn DeadLetterRepository>,
}

impl Repositories {
    /// Non-persistent repositories
    pub fn in_memory() -> Self {
        Self {
            violations: Arc::new(MemoryViolationRepository::new()),
            scores: Arc::new(MemoryDriverScoreRepository::new()),
            dead_letters: Arc::new(MemoryDeadLetterRepository::new()),
        }
    }
}

/// Open file-based repositories in the configured store directory
pub fn open_repositories(config: &Config) -> Result<Repositories> {
    let store_dir = config.store_dir()?;
    open_repositories_at(store_dir)
}

/// Open file-based repositories at a custom directory
pub fn open_repositories_at(store_dir: PathBuf) -> Result<Repositories> {
    Ok(Repositories {
        violations: Arc::new(FileViolationRepository::open(store_dir.clone())?),
        scores: Arc::new(FileDriverScoreRepository::open(store_dir.clone())?),
        dead_letters: Arc::new(FileDeadLetterRepository::open(store_dir)?),
    })
}
