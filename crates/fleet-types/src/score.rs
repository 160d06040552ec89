//! Driver score types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Score every driver starts from
pub const BASELINE_SCORE: u32 = 100;

/// Score band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreCategory {
    /// 91-100
    Excellent,
    /// 76-90
    Good,
    /// 61-75
    Average,
    /// 41-60
    Poor,
    /// 0-40
    Critical,
}

impl ScoreCategory {
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s > 90 => ScoreCategory::Excellent,
            s if s > 75 => ScoreCategory::Good,
            s if s > 60 => ScoreCategory::Average,
            s if s > 40 => ScoreCategory::Poor,
            // 40 itself lands here
            _ => ScoreCategory::Critical,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreCategory::Excellent => "EXCELLENT",
            ScoreCategory::Good => "GOOD",
            ScoreCategory::Average => "AVERAGE",
            ScoreCategory::Poor => "POOR",
            ScoreCategory::Critical => "CRITICAL",
        }
    }

    /// Follow-up suggested to fleet managers for drivers in this band
    pub fn recommended_action(&self) -> &'static str {
        match self {
            ScoreCategory::Excellent => "No action needed",
            ScoreCategory::Good => "Acknowledge good driving",
            ScoreCategory::Average => "Review recent violations with driver",
            ScoreCategory::Poor => "Schedule refresher training",
            ScoreCategory::Critical => "Suspend and retrain immediately",
        }
    }
}

impl std::fmt::Display for ScoreCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Current score of one driver. Always replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverScore {
    pub driver_id: String,
    pub current_score: u32,
    pub score_category: ScoreCategory,
    /// Violations counted in the current window
    pub total_violations: u32,
    #[serde(default)]
    pub last_violation_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    /// Bumped on every write; used for compare-and-swap
    #[serde(default)]
    pub version: u64,
}
