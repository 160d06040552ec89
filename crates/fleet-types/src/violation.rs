//! Violation event and record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::telemetry::{TelemetryReading, TirePosition};

/// Kind of rule breach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    Speeding,
    /// Older producers spell this "LOW FUEL"
    #[serde(alias = "LOW FUEL")]
    LowFuel,
    HighTemp,
    LowTirePressure,
    /// Type name not known to this build
    #[serde(other)]
    Unknown,
}

impl ViolationKind {
    /// Wire name
    pub fn code(&self) -> &'static str {
        match self {
            ViolationKind::Speeding => "SPEEDING",
            ViolationKind::LowFuel => "LOW_FUEL",
            ViolationKind::HighTemp => "HIGH_TEMP",
            ViolationKind::LowTirePressure => "LOW_TIRE_PRESSURE",
            ViolationKind::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Reading metric a rule inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Metric {
    Speed,
    FuelLevel,
    EngineTemp,
    Tire(TirePosition),
}

impl Metric {
    /// Current value of this metric in a reading
    pub fn value(&self, reading: &TelemetryReading) -> f64 {
        match self {
            Metric::Speed => reading.speed,
            Metric::FuelLevel => reading.fuel_level,
            Metric::EngineTemp => reading.engine_temp,
            Metric::Tire(position) => reading.tire_pressure.get(*position),
        }
    }

    /// Stable key used in fingerprints
    pub fn key(&self) -> String {
        match self {
            Metric::Speed => "speed".to_string(),
            Metric::FuelLevel => "fuel_level".to_string(),
            Metric::EngineTemp => "engine_temp".to_string(),
            Metric::Tire(position) => format!("tire:{}", position.label().replace(' ', "_")),
        }
    }
}

/// In-flight violation, produced by the rule evaluator and consumed by the recorder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationEvent {
    pub violation_id: Uuid,
    pub truck_id: String,
    pub driver_id: String,
    pub violation_type: ViolationKind,
    pub severity: Severity,
    /// Metric that tripped the rule; absent on events from older producers
    #[serde(default)]
    pub subject: Option<Metric>,
    pub message: String,
    pub original_data: TelemetryReading,
    pub detected_at: DateTime<Utc>,
}

/// Persisted violation. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Identity minted by the recorder
    pub id: Uuid,
    /// Identity of the event this was recorded from
    pub violation_id: Uuid,
    /// Natural de-duplication key
    pub fingerprint: String,
    pub truck_id: String,
    pub driver_id: String,
    pub violation_type: ViolationKind,
    pub severity: Severity,
    #[serde(default)]
    pub subject: Option<Metric>,
    pub message: String,
    pub original_data: TelemetryReading,
    pub detected_at: DateTime<Utc>,
    pub points_deducted: u32,
    pub recorded_at: DateTime<Utc>,
}

/// Pipeline stage that gave up on a piece of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureStage {
    RecordViolation,
    RecomputeScore,
}

/// Work that failed after all retries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    pub id: Uuid,
    pub stage: FailureStage,
    pub driver_id: String,
    #[serde(default)]
    pub event: Option<ViolationEvent>,
    pub error: String,
    pub attempts: u32,
    pub failed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        let kind: ViolationKind = serde_json::from_str("\"LOW_TIRE_PRESSURE\"").unwrap();
        assert_eq!(kind, ViolationKind::LowTirePressure);
        assert_eq!(serde_json::to_string(&ViolationKind::HighTemp).unwrap(), "\"HIGH_TEMP\"");
    }

    #[test]
    fn test_legacy_low_fuel_spelling() {
        let kind: ViolationKind = serde_json::from_str("\"LOW FUEL\"").unwrap();
        assert_eq!(kind, ViolationKind::LowFuel);
    }

    #[test]
    fn test_unknown_kind() {
        let kind: ViolationKind = serde_json::from_str("\"HARSH_BRAKING\"").unwrap();
        assert_eq!(kind, ViolationKind::Unknown);
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_metric_keys_distinct() {
        let keys: std::collections::HashSet<String> = TirePosition::ALL
            .iter()
            .map(|p| Metric::Tire(*p).key())
            .chain([Metric::Speed.key(), Metric::FuelLevel.key(), Metric::EngineTemp.key()])
            .collect();
        assert_eq!(keys.len(), 7);
        assert_eq!(Metric::Tire(TirePosition::RearLeft).key(), "tire:rear_left");
    }
}
