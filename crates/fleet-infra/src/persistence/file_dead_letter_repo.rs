//! File-based dead letter repository implementation

use std::path::PathBuf;
use std::sync::Mutex;

use fleet_domain::repository::DeadLetterRepository;
use fleet_types::{DeadLetter, Error, Result};

use super::json_file::{lock, JsonFile};

/// Stores dead letters in `dead_letters.json`, oldest first
pub struct FileDeadLetterRepository {
    file: JsonFile,
    letters: Mutex<Vec<DeadLetter>>,
}

impl FileDeadLetterRepository {
    pub fn open(store_dir: PathBuf) -> Result<Self> {
        let file = JsonFile::new(&store_dir, "dead_letters.json")?;
        let letters = file.load()?;
        Ok(Self {
            file,
            letters: Mutex::new(letters),
        })
    }
}

impl DeadLetterRepository for FileDeadLetterRepository {
    fn push(&self, letter: &DeadLetter) -> std::result::Result<(), Error> {
        let mut letters = lock(&self.letters)?;
        letters.push(letter.clone());
        if let Err(e) = self.file.save(&*letters) {
            letters.pop();
            return Err(e);
        }
        Ok(())
    }

    fn find_all(&self) -> std::result::Result<Vec<DeadLetter>, Error> {
        Ok(lock(&self.letters)?.clone())
    }
}
