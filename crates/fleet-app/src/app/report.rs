//! Read-only reports over recorded violations and stored scores

use std::cmp::Reverse;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use fleet_domain::repository::{DriverScoreRepository, ViolationRepository};
use fleet_domain::service::window_start;
use fleet_types::{DriverScore, Result, ScoreCategory, Violation, ViolationKind};

use crate::repository::Repositories;

/// Violation counts per type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationBreakdown {
    pub speeding: u32,
    pub low_tire_pressure: u32,
    pub low_fuel: u32,
    pub high_temp: u32,
    pub other: u32,
}

impl ViolationBreakdown {
    pub fn tally(violations: &[Violation]) -> Self {
        let mut breakdown = Self::default();
        for v in violations {
            let bucket = match v.violation_type {
                ViolationKind::Speeding => &mut breakdown.speeding,
                ViolationKind::LowTirePressure => &mut breakdown.low_tire_pressure,
                ViolationKind::LowFuel => &mut breakdown.low_fuel,
                ViolationKind::HighTemp => &mut breakdown.high_temp,
                ViolationKind::Unknown => &mut breakdown.other,
            };
            *bucket += 1;
        }
        breakdown
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverReport {
    pub score: DriverScore,
    pub window_days: i64,
    pub window_violations: u32,
    pub breakdown: ViolationBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationHistory {
    pub driver_id: String,
    pub days: u32,
    pub total: usize,
    /// Newest first
    pub violations: Vec<Violation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardOrder {
    /// Highest scores first
    Top,
    /// Lowest scores first, with a recommended action
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub driver_id: String,
    pub current_score: u32,
    pub score_category: ScoreCategory,
    pub window_violations: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_action: Option<String>,
}

pub struct Reports {
    violations: Arc<dyn ViolationRepository>,
    scores: Arc<dyn DriverScoreRepository>,
    window: Duration,
}

impl Reports {
    pub fn new(repos: &Repositories, window: Duration) -> Self {
        Self {
            violations: Arc::clone(&repos.violations),
            scores: Arc::clone(&repos.scores),
            window,
        }
    }

    /// Stored score plus a per-type breakdown of the window. `None` if the
    /// driver has never been scored.
    pub fn driver_report(&self, driver_id: &str, now: DateTime<Utc>) -> Result<Option<DriverReport>> {
        let Some(score) = self.scores.find_by_driver(driver_id)? else {
            return Ok(None);
        };
        let in_window = self
            .violations
            .find_by_driver_since(driver_id, window_start(now, self.window))?;

        Ok(Some(DriverReport {
            score,
            window_days: self.window.num_days(),
            window_violations: in_window.len() as u32,
            breakdown: ViolationBreakdown::tally(&in_window),
        }))
    }

    pub fn violation_history(
        &self,
        driver_id: &str,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<ViolationHistory> {
        let since = window_start(now, Duration::days(i64::from(days)));
        let mut violations = self.violations.find_by_driver_since(driver_id, since)?;
        violations.sort_by_key(|v| Reverse(v.recorded_at));

        Ok(ViolationHistory {
            driver_id: driver_id.to_string(),
            days,
            total: violations.len(),
            violations,
        })
    }

    pub fn leaderboard(
        &self,
        limit: usize,
        order: LeaderboardOrder,
        now: DateTime<Utc>,
    ) -> Result<Vec<LeaderboardEntry>> {
        let mut scores = self.scores.find_all()?;
        match order {
            LeaderboardOrder::Top => scores.sort_by(|a, b| {
                b.current_score
                    .cmp(&a.current_score)
                    .then_with(|| a.driver_id.cmp(&b.driver_id))
            }),
            LeaderboardOrder::Bottom => scores.sort_by(|a, b| {
                a.current_score
                    .cmp(&b.current_score)
                    .then_with(|| a.driver_id.cmp(&b.driver_id))
            }),
        }

        let since = window_start(now, self.window);
        scores
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, score)| {
                let window_violations =
                    self.violations.find_by_driver_since(&score.driver_id, since)?.len() as u32;
                let recommended_action = match order {
                    LeaderboardOrder::Top => None,
                    LeaderboardOrder::Bottom => {
                        Some(score.score_category.recommended_action().to_string())
                    }
                };
                Ok(LeaderboardEntry {
                    rank: i + 1,
                    driver_id: score.driver_id,
                    current_score: score.current_score,
                    score_category: score.score_category,
                    window_violations,
                    recommended_action,
                })
            })
            .collect()
    }
}
