//! Score Aggregator - recompute a driver's score from their violation window

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use fleet_domain::repository::{DriverScoreRepository, ViolationRepository};
use fleet_domain::service::{compute_standing, window_start};
use fleet_types::DriverScore;

use super::retry::{run_blocking, RetryFailure, RetryPolicy};
use crate::repository::Repositories;

pub struct ScoreAggregator {
    violations: Arc<dyn ViolationRepository>,
    scores: Arc<dyn DriverScoreRepository>,
    window: Duration,
    retry: RetryPolicy,
}

impl ScoreAggregator {
    pub fn new(repos: &Repositories, window: Duration, retry: RetryPolicy) -> Self {
        Self {
            violations: Arc::clone(&repos.violations),
            scores: Arc::clone(&repos.scores),
            window,
            retry,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub async fn recompute(&self, driver_id: &str) -> Result<DriverScore, RetryFailure> {
        self.recompute_at(driver_id, Utc::now()).await
    }

    /// Replace the driver's score with one computed from the window ending at `now`.
    ///
    /// The stored version is read before the violations, and the write only
    /// lands if that version is still current. A concurrent writer therefore
    /// forces a full re-read instead of being overwritten.
    pub async fn recompute_at(
        &self,
        driver_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DriverScore, RetryFailure> {
        let violations = Arc::clone(&self.violations);
        let scores = Arc::clone(&self.scores);
        let driver = driver_id.to_string();
        let window = self.window;

        let (score, attempts) = run_blocking(&self.retry, "score recompute", move || {
            let current = scores.find_by_driver(&driver)?;
            let in_window = violations.find_by_driver_since(&driver, window_start(now, window))?;
            let standing = compute_standing(&in_window, now, window);

            let expected = current.as_ref().map(|s| s.version);
            let next = standing.into_driver_score(&driver, now, expected.map_or(1, |v| v + 1));
            scores.replace(&next, expected)?;
            Ok(next)
        })
        .await?;

        log::info!(
            "driver {} scored {} ({}) from {} violations{}",
            score.driver_id,
            score.current_score,
            score.score_category,
            score.total_violations,
            if attempts > 1 {
                format!(" after {} attempts", attempts)
            } else {
                String::new()
            }
        );
        Ok(score)
    }
}
