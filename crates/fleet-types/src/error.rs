//! Error types for fleet driver scoring

use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration not found")]
    NotFound,

    #[error("Failed to save configuration: {0}")]
    SaveError(String),
}

/// Persistence-related errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store data corrupted: {0}")]
    Corrupted(String),

    #[error("Score for driver {driver_id} changed concurrently (expected version {expected:?}, found {found:?})")]
    VersionConflict {
        driver_id: String,
        expected: Option<u64>,
        found: Option<u64>,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Invalid reading: {0}")]
    InvalidReading(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl Error {
    /// Whether retrying the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::Timeout(_)
                | Error::Store(StoreError::Unavailable(_))
                | Error::Store(StoreError::VersionConflict { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
