//! Trailing-window score calculation

use chrono::{DateTime, Duration, Utc};

use fleet_types::{ScoreCategory, Violation, BASELINE_SCORE};

use crate::model::ScoreStanding;

pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Lower bound (exclusive) of the scoring window ending at `now`.
///
/// Saturates at the earliest representable instant, so a window longer than
/// the calendar covers everything.
pub fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Score a driver from their violations.
///
/// Only violations recorded strictly after the window start count, so the
/// caller may pass an over-fetched list.
pub fn compute_standing(
    violations: &[Violation],
    now: DateTime<Utc>,
    window: Duration,
) -> ScoreStanding {
    let since = window_start(now, window);
    let in_window: Vec<&Violation> = violations.iter().filter(|v| v.recorded_at > since).collect();

    let deducted: u64 = in_window.iter().map(|v| u64::from(v.points_deducted)).sum();
    let score = u64::from(BASELINE_SCORE).saturating_sub(deducted) as u32;

    ScoreStanding {
        score,
        category: ScoreCategory::from_score(score),
        total_violations: in_window.len() as u32,
        last_violation_date: in_window.iter().map(|v| v.recorded_at).max(),
    }
}
