//! Scoring Service - wires repositories, recorder, aggregator and reports
//!
//! One instance per store. The CLI opens it from config; tests build it over
//! in-memory repositories.

use std::sync::Arc;

use fleet_types::{DeadLetter, Result};

use super::aggregator::ScoreAggregator;
use super::pipeline::{Pipeline, PipelineSettings};
use super::recorder::ViolationRecorder;
use super::report::Reports;
use crate::config::Config;
use crate::repository::{open_repositories, Repositories};

pub struct ScoringService {
    config: Config,
    repos: Repositories,
    aggregator: Arc<ScoreAggregator>,
    recorder: Arc<ViolationRecorder>,
    reports: Reports,
}

impl ScoringService {
    /// Open the file store named by the config
    pub fn open(config: Config) -> Result<Self> {
        let repos = open_repositories(&config)?;
        Ok(Self::with_repositories(repos, config))
    }

    pub fn with_repositories(repos: Repositories, config: Config) -> Self {
        let retry = config.retry_policy();
        let aggregator = Arc::new(ScoreAggregator::new(&repos, config.window(), retry));
        let recorder = Arc::new(ViolationRecorder::new(
            &repos,
            Arc::clone(&aggregator),
            retry,
        ));
        let reports = Reports::new(&repos, config.window());
        Self {
            config,
            repos,
            aggregator,
            recorder,
            reports,
        }
    }

    /// Spawn shard workers sized from the config
    pub fn start_pipeline(&self) -> Pipeline {
        Pipeline::start(
            Arc::clone(&self.recorder),
            PipelineSettings {
                workers: self.config.worker_count(),
                channel_capacity: self.config.channel_capacity,
            },
        )
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    pub fn aggregator(&self) -> &Arc<ScoreAggregator> {
        &self.aggregator
    }

    pub fn recorder(&self) -> &Arc<ViolationRecorder> {
        &self.recorder
    }

    pub fn reports(&self) -> &Reports {
        &self.reports
    }

    /// Dead letters, oldest first
    pub fn dead_letters(&self) -> Result<Vec<DeadLetter>> {
        let mut letters = self.repos.dead_letters.find_all()?;
        letters.sort_by_key(|l| l.failed_at);
        Ok(letters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_store() {
        let dir = tempdir().unwrap();
        let config = Config {
            store_dir: Some(dir.path().join("store")),
            ..Config::default()
        };
        let service = ScoringService::open(config).unwrap();
        assert!(service.dead_letters().unwrap().is_empty());
        assert_eq!(service.aggregator().window(), chrono::Duration::days(30));
    }
}
