use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleet_types::{DriverScore, ScoreCategory};

/// Score figures derived from one window of violations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreStanding {
    pub score: u32,
    pub category: ScoreCategory,
    pub total_violations: u32,
    pub last_violation_date: Option<DateTime<Utc>>,
}

impl ScoreStanding {
    /// Build the replacement score row; `version` is the next version to store
    pub fn into_driver_score(
        self,
        driver_id: &str,
        updated_at: DateTime<Utc>,
        version: u64,
    ) -> DriverScore {
        DriverScore {
            driver_id: driver_id.to_string(),
            current_score: self.score,
            score_category: self.category,
            total_violations: self.total_violations,
            last_violation_date: self.last_violation_date,
            updated_at,
            version,
        }
    }
}

impl From<&DriverScore> for ScoreStanding {
    fn from(score: &DriverScore) -> Self {
        Self {
            score: score.current_score,
            category: score.score_category,
            total_violations: score.total_violations,
            last_violation_date: score.last_violation_date,
        }
    }
}
