//! Configuration management for fleet-scoring
//!
//! Config stored at: ~/.config/fleet-scoring/config.toml

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use fleet_domain::service::DEFAULT_WINDOW_DAYS;
use fleet_types::{ConfigError, OutputFormat, Result};

use crate::app::retry::RetryPolicy;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Store directory override
    #[serde(default)]
    pub store_dir: Option<PathBuf>,

    /// Trailing scoring window in days
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// Number of shard workers. 0 = auto (CPU count)
    #[serde(default)]
    pub workers: usize,

    /// Queue depth per shard before submitters wait
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Upper bound for a single store call
    #[serde(default = "default_persistence_timeout_ms")]
    pub persistence_timeout_ms: u64,

    /// Attempts per store operation before dead-lettering
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First retry delay; doubles on each further attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Default output format (json, table)
    #[serde(default)]
    pub output_format: OutputFormat,
}

fn default_window_days() -> u32 {
    DEFAULT_WINDOW_DAYS as u32
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_persistence_timeout_ms() -> u64 {
    2000
}

fn default_max_attempts() -> u32 {
    4
}

fn default_retry_backoff_ms() -> u64 {
    50
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: None,
            window_days: default_window_days(),
            workers: 0,
            channel_capacity: default_channel_capacity(),
            persistence_timeout_ms: default_persistence_timeout_ms(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            output_format: OutputFormat::default(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NotFound)?
            .join("fleet-scoring");
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the store directory path
    pub fn store_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.store_dir {
            return Ok(dir.clone());
        }

        let store_dir = dirs::data_dir()
            .ok_or(ConfigError::NotFound)?
            .join("fleet-scoring");
        Ok(store_dir)
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolved shard worker count
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }

    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.window_days))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.retry_backoff_ms),
            timeout: Duration::from_millis(self.persistence_timeout_ms),
        }
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Fleet Scoring Configuration")?;
        writeln!(f, "===========================")?;
        writeln!(f)?;
        writeln!(
            f,
            "Store dir:        {}",
            self.store_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "(error)".to_string())
        )?;
        writeln!(f, "Window:           {} days", self.window_days)?;
        writeln!(
            f,
            "Workers:          {}{}",
            self.worker_count(),
            if self.workers == 0 { " (auto)" } else { "" }
        )?;
        writeln!(f, "Channel capacity: {}", self.channel_capacity)?;
        writeln!(f, "Store timeout:    {} ms", self.persistence_timeout_ms)?;
        writeln!(f, "Max attempts:     {}", self.max_attempts)?;
        writeln!(f, "Retry backoff:    {} ms", self.retry_backoff_ms)?;
        writeln!(f, "Output format:    {}", self.output_format)?;

        if let Ok(path) = Self::config_path() {
            writeln!(f)?;
            writeln!(f, "Config file:      {}", path.display())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.window_days, 30);
        assert_eq!(config.window(), chrono::Duration::days(30));
        assert!(config.worker_count() >= 1);
        assert_eq!(config.retry_policy().max_attempts, 4);
    }

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            store_dir: Some(dir.path().join("store")),
            window_days: 14,
            workers: 2,
            output_format: OutputFormat::Json,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "window_days = 7\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.window_days, 7);
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.channel_capacity, 1024);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let config = Config {
            max_attempts: 0,
            ..Config::default()
        };
        assert_eq!(config.retry_policy().max_attempts, 1);
    }
}
