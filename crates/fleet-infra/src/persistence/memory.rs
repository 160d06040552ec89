//! In-memory repositories, used for dry runs and tests

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use fleet_domain::repository::{
    DeadLetterRepository, DriverScoreRepository, InsertOutcome, ViolationRepository,
};
use fleet_types::{DeadLetter, DriverScore, Error, Violation};

use super::file_driver_score_repo::check_version;
use super::json_file::lock;

#[derive(Default)]
pub struct MemoryViolationRepository {
    entries: Mutex<HashMap<String, Violation>>,
}

impl MemoryViolationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ViolationRepository for MemoryViolationRepository {
    fn insert(&self, violation: &Violation) -> Result<InsertOutcome, Error> {
        let mut entries = lock(&self.entries)?;
        if entries.contains_key(&violation.fingerprint) {
            return Ok(InsertOutcome::Duplicate);
        }
        entries.insert(violation.fingerprint.clone(), violation.clone());
        Ok(InsertOutcome::Inserted)
    }

    fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Violation>, Error> {
        Ok(lock(&self.entries)?.get(fingerprint).cloned())
    }

    fn find_by_driver_since(
        &self,
        driver_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Violation>, Error> {
        let mut found: Vec<Violation> = lock(&self.entries)?
            .values()
            .filter(|v| v.driver_id == driver_id && v.recorded_at > since)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(found)
    }

    fn find_all(&self) -> Result<Vec<Violation>, Error> {
        let mut all: Vec<Violation> = lock(&self.entries)?.values().cloned().collect();
        all.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(all)
    }
}

#[derive(Default)]
pub struct MemoryDriverScoreRepository {
    scores: Mutex<HashMap<String, DriverScore>>,
}

impl MemoryDriverScoreRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DriverScoreRepository for MemoryDriverScoreRepository {
    fn find_by_driver(&self, driver_id: &str) -> Result<Option<DriverScore>, Error> {
        Ok(lock(&self.scores)?.get(driver_id).cloned())
    }

    fn replace(&self, score: &DriverScore, expected_version: Option<u64>) -> Result<(), Error> {
        let mut scores = lock(&self.scores)?;
        check_version(&score.driver_id, scores.get(&score.driver_id), expected_version)?;
        scores.insert(score.driver_id.clone(), score.clone());
        Ok(())
    }

    fn find_all(&self) -> Result<Vec<DriverScore>, Error> {
        Ok(lock(&self.scores)?.values().cloned().collect())
    }
}

#[derive(Default)]
pub struct MemoryDeadLetterRepository {
    letters: Mutex<Vec<DeadLetter>>,
}

impl MemoryDeadLetterRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeadLetterRepository for MemoryDeadLetterRepository {
    fn push(&self, letter: &DeadLetter) -> Result<(), Error> {
        lock(&self.letters)?.push(letter.clone());
        Ok(())
    }

    fn find_all(&self) -> Result<Vec<DeadLetter>, Error> {
        Ok(lock(&self.letters)?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::test_support::{score_for, violation_for};
    use chrono::Duration;

    #[test]
    fn test_memory_violation_dedup() {
        let repo = MemoryViolationRepository::new();
        let now = Utc::now();
        assert_eq!(
            repo.insert(&violation_for("DRV-1", "fp", now)).unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            repo.insert(&violation_for("DRV-1", "fp", now)).unwrap(),
            InsertOutcome::Duplicate
        );
        assert_eq!(
            repo.find_by_driver_since("DRV-1", now - Duration::days(30))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_memory_score_version_check() {
        let repo = MemoryDriverScoreRepository::new();
        repo.replace(&score_for("DRV-1", 100, 1), None).unwrap();
        assert!(repo.replace(&score_for("DRV-1", 98, 1), None).is_err());
        repo.replace(&score_for("DRV-1", 98, 2), Some(1)).unwrap();
        assert_eq!(repo.find_by_driver("DRV-1").unwrap().unwrap().version, 2);
    }
}
