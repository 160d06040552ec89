//! Repository trait definitions for data persistence
//!
//! Implementations must be shareable across worker threads; the pipeline calls
//! them from tokio's blocking pool.

use chrono::{DateTime, Utc};

use fleet_types::{DeadLetter, DriverScore, Error, Violation};

/// Result of inserting a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A violation with the same fingerprint already exists; nothing written
    Duplicate,
}

/// Repository for persisted violations (append-only)
pub trait ViolationRepository: Send + Sync {
    /// Insert unless the fingerprint is already stored
    fn insert(&self, violation: &Violation) -> Result<InsertOutcome, Error>;

    /// The stored violation carrying `fingerprint`, if any
    fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Violation>, Error>;

    /// Violations of a driver recorded strictly after `since`
    fn find_by_driver_since(
        &self,
        driver_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Violation>, Error>;

    /// Find all violations
    fn find_all(&self) -> Result<Vec<Violation>, Error>;
}

/// Repository for current driver scores (one row per driver)
pub trait DriverScoreRepository: Send + Sync {
    /// Find the current score of a driver
    fn find_by_driver(&self, driver_id: &str) -> Result<Option<DriverScore>, Error>;

    /// Replace the driver's score if its stored version still equals
    /// `expected_version` (`None` = no row yet).
    ///
    /// Fails with `StoreError::VersionConflict` otherwise.
    fn replace(&self, score: &DriverScore, expected_version: Option<u64>) -> Result<(), Error>;

    /// Find all scores
    fn find_all(&self) -> Result<Vec<DriverScore>, Error>;
}

/// Repository for work that failed after all retries
pub trait DeadLetterRepository: Send + Sync {
    fn push(&self, letter: &DeadLetter) -> Result<(), Error>;

    fn find_all(&self) -> Result<Vec<DeadLetter>, Error>;
}
