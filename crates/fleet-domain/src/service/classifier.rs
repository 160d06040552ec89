//! Violation classification: (type, severity) to point deduction

use fleet_types::{Severity, ViolationKind};

/// Points for specific (type, severity) pairs. `None` matches any severity.
pub const POINT_TABLE: &[(ViolationKind, Option<Severity>, u32)] = &[
    (ViolationKind::Speeding, Some(Severity::High), 5),
    (ViolationKind::Speeding, Some(Severity::Medium), 2),
    (ViolationKind::LowFuel, Some(Severity::Critical), 3),
    (ViolationKind::LowFuel, Some(Severity::High), 1),
    (ViolationKind::HighTemp, Some(Severity::Critical), 5),
    (ViolationKind::HighTemp, Some(Severity::High), 3),
    (ViolationKind::LowTirePressure, None, 2),
];

/// Fallback for a known type with a severity the table does not list
pub fn fallback_points(severity: Severity) -> u32 {
    match severity {
        Severity::Critical => 4,
        Severity::High => 3,
        Severity::Medium => 2,
        Severity::Low => 1,
    }
}

/// Point deduction for a violation. Never fails; unknown types deduct nothing.
pub fn points_for(kind: ViolationKind, severity: Severity) -> u32 {
    if kind == ViolationKind::Unknown {
        return 0;
    }
    POINT_TABLE
        .iter()
        .find(|(k, s, _)| *k == kind && s.map_or(true, |s| s == severity))
        .map(|(_, _, points)| *points)
        .unwrap_or_else(|| fallback_points(severity))
}
