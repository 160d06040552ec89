//! File-based driver score repository implementation

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use fleet_domain::repository::DriverScoreRepository;
use fleet_types::{DriverScore, Error, Result, StoreError};

use super::json_file::{lock, JsonFile};

/// File-based implementation of DriverScoreRepository
///
/// Stores one score per driver in `driver_scores.json`.
pub struct FileDriverScoreRepository {
    file: JsonFile,
    scores: Mutex<HashMap<String, DriverScore>>,
}

impl FileDriverScoreRepository {
    /// Create or load a score repository
    pub fn open(store_dir: PathBuf) -> Result<Self> {
        let file = JsonFile::new(&store_dir, "driver_scores.json")?;
        let scores: HashMap<String, DriverScore> = file.load()?;
        log::debug!("loaded {} driver scores from {}", scores.len(), file.path().display());
        Ok(Self {
            file,
            scores: Mutex::new(scores),
        })
    }
}

/// Check the stored version against the caller's expectation
pub(crate) fn check_version(
    driver_id: &str,
    current: Option<&DriverScore>,
    expected: Option<u64>,
) -> Result<()> {
    let found = current.map(|s| s.version);
    if found != expected {
        return Err(StoreError::VersionConflict {
            driver_id: driver_id.to_string(),
            expected,
            found,
        }
        .into());
    }
    Ok(())
}

impl DriverScoreRepository for FileDriverScoreRepository {
    fn find_by_driver(&self, driver_id: &str) -> std::result::Result<Option<DriverScore>, Error> {
        Ok(lock(&self.scores)?.get(driver_id).cloned())
    }

    fn replace(
        &self,
        score: &DriverScore,
        expected_version: Option<u64>,
    ) -> std::result::Result<(), Error> {
        let mut scores = lock(&self.scores)?;
        check_version(&score.driver_id, scores.get(&score.driver_id), expected_version)?;

        let previous = scores.insert(score.driver_id.clone(), score.clone());
        if let Err(e) = self.file.save(&*scores) {
            match previous {
                Some(prev) => scores.insert(score.driver_id.clone(), prev),
                None => scores.remove(&score.driver_id),
            };
            return Err(e);
        }
        Ok(())
    }

    fn find_all(&self) -> std::result::Result<Vec<DriverScore>, Error> {
        Ok(lock(&self.scores)?.values().cloned().collect())
    }
}
