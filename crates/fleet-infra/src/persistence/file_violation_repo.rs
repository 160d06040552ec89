//! File-based violation repository implementation

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use fleet_domain::repository::{InsertOutcome, ViolationRepository};
use fleet_types::{Error, Result, Violation};

use super::json_file::{lock, JsonFile};

/// File-based implementation of ViolationRepository
///
/// Stores violations in `violations.json`, keyed by fingerprint.
pub struct FileViolationRepository {
    file: JsonFile,
    entries: Mutex<HashMap<String, Violation>>,
}

impl FileViolationRepository {
    /// Create or load a violation repository
    pub fn open(store_dir: PathBuf) -> Result<Self> {
        let file = JsonFile::new(&store_dir, "violations.json")?;
        let entries: HashMap<String, Violation> = file.load()?;
        log::debug!("loaded {} violations from {}", entries.len(), file.path().display());
        Ok(Self {
            file,
            entries: Mutex::new(entries),
        })
    }

    pub fn len(&self) -> Result<usize> {
        Ok(lock(&self.entries)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl ViolationRepository for FileViolationRepository {
    fn insert(&self, violation: &Violation) -> std::result::Result<InsertOutcome, Error> {
        let mut entries = lock(&self.entries)?;
        if entries.contains_key(&violation.fingerprint) {
            return Ok(InsertOutcome::Duplicate);
        }
        entries.insert(violation.fingerprint.clone(), violation.clone());
        if let Err(e) = self.file.save(&*entries) {
            entries.remove(&violation.fingerprint);
            return Err(e);
        }
        Ok(InsertOutcome::Inserted)
    }

    fn find_by_fingerprint(&self, fingerprint: &str) -> std::result::Result<Option<Violation>, Error> {
        Ok(lock(&self.entries)?.get(fingerprint).cloned())
    }

    fn find_by_driver_since(
        &self,
        driver_id: &str,
        since: DateTime<Utc>,
    ) -> std::result::Result<Vec<Violation>, Error> {
        let entries = lock(&self.entries)?;
        let mut found: Vec<Violation> = entries
            .values()
            .filter(|v| v.driver_id == driver_id && v.recorded_at > since)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(found)
    }

    fn find_all(&self) -> std::result::Result<Vec<Violation>, Error> {
        let mut all: Vec<Violation> = lock(&self.entries)?.values().cloned().collect();
        all.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(all)
    }
}
