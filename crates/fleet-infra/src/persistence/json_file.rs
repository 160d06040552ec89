//! Whole-file JSON persistence shared by the file repositories

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;

use fleet_types::{Result, StoreError};

/// A JSON document on disk, rewritten in full on every save
pub(crate) struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub(crate) fn new(store_dir: &Path, file_name: &str) -> Result<Self> {
        fs::create_dir_all(store_dir)?;
        Ok(Self {
            path: store_dir.join(file_name),
        })
    }

    /// Load the document, or the default value if the file does not exist yet
    pub(crate) fn load<T: DeserializeOwned + Default>(&self) -> Result<T> {
        if !self.path.exists() {
            return Ok(T::default());
        }
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| {
            StoreError::Corrupted(format!("{}: {}", self.path.display(), e)).into()
        })
    }

    /// Write to a sibling temp file, then rename over the old document
    pub(crate) fn save<T: Serialize>(&self, value: &T) -> Result<()> {
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

/// Lock a repository table, treating a poisoned lock as an unavailable store
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable("repository lock poisoned".to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_loads_default() {
        let dir = tempdir().unwrap();
        let file = JsonFile::new(dir.path(), "scores.json").unwrap();
        let loaded: HashMap<String, u32> = file.load().unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let file = JsonFile::new(dir.path(), "scores.json").unwrap();
        let mut map = HashMap::new();
        map.insert("DRV-1".to_string(), 94u32);
        file.save(&map).unwrap();

        let loaded: HashMap<String, u32> = file.load().unwrap();
        assert_eq!(loaded.get("DRV-1"), Some(&94));
        assert!(!file.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_corrupted_file_reported() {
        let dir = tempdir().unwrap();
        let file = JsonFile::new(dir.path(), "scores.json").unwrap();
        fs::write(file.path(), "{not json").unwrap();
        let loaded: Result<HashMap<String, u32>> = file.load();
        assert!(matches!(
            loaded,
            Err(fleet_types::Error::Store(StoreError::Corrupted(_)))
        ));
    }
}
