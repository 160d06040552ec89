//! Rule evaluation: one telemetry reading to zero or more violation events
//!
//! Rules live in a single table and are checked independently, in table order.
//! Adding a rule is a table change. A reading trips at most one speeding, one
//! fuel and one temperature rule, plus one rule per under-inflated tire, so at
//! most seven events come out of one reading.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use fleet_types::{
    Metric, Severity, TelemetryReading, TirePosition, ViolationEvent, ViolationKind,
};

use crate::model::{Condition, Rule, Threshold};

pub const SPEEDING_LIMIT_KMH: f64 = 80.0;
pub const EXCESSIVE_SPEED_KMH: f64 = 100.0;
pub const LOW_FUEL_PERCENT: f64 = 15.0;
pub const CRITICAL_FUEL_PERCENT: f64 = 5.0;
pub const HIGH_TEMP_CELSIUS: f64 = 110.0;
/// Severity split for HIGH_TEMP. Compared against fuel level, as deployed.
pub const HIGH_TEMP_SEVERITY_SPLIT: f64 = 120.0;
pub const LOW_TIRE_PSI: f64 = 28.0;

const fn tire_rule(position: TirePosition) -> Rule {
    Rule {
        kind: ViolationKind::LowTirePressure,
        severity: Severity::Critical,
        subject: Metric::Tire(position),
        conditions: match position {
            TirePosition::FrontLeft => FRONT_LEFT_LOW,
            TirePosition::FrontRight => FRONT_RIGHT_LOW,
            TirePosition::RearLeft => REAR_LEFT_LOW,
            TirePosition::RearRight => REAR_RIGHT_LOW,
        },
    }
}

const FRONT_LEFT_LOW: &[Condition] = &[Condition::new(
    Metric::Tire(TirePosition::FrontLeft),
    Threshold::Below(LOW_TIRE_PSI),
)];
const FRONT_RIGHT_LOW: &[Condition] = &[Condition::new(
    Metric::Tire(TirePosition::FrontRight),
    Threshold::Below(LOW_TIRE_PSI),
)];
const REAR_LEFT_LOW: &[Condition] = &[Condition::new(
    Metric::Tire(TirePosition::RearLeft),
    Threshold::Below(LOW_TIRE_PSI),
)];
const REAR_RIGHT_LOW: &[Condition] = &[Condition::new(
    Metric::Tire(TirePosition::RearRight),
    Threshold::Below(LOW_TIRE_PSI),
)];

/// The rule table
pub const RULES: &[Rule] = &[
    Rule {
        kind: ViolationKind::Speeding,
        severity: Severity::High,
        subject: Metric::Speed,
        conditions: &[Condition::new(Metric::Speed, Threshold::Above(EXCESSIVE_SPEED_KMH))],
    },
    Rule {
        kind: ViolationKind::Speeding,
        severity: Severity::Medium,
        subject: Metric::Speed,
        conditions: &[
            Condition::new(Metric::Speed, Threshold::Above(SPEEDING_LIMIT_KMH)),
            Condition::new(Metric::Speed, Threshold::AtMost(EXCESSIVE_SPEED_KMH)),
        ],
    },
    Rule {
        kind: ViolationKind::LowFuel,
        severity: Severity::Critical,
        subject: Metric::FuelLevel,
        conditions: &[Condition::new(Metric::FuelLevel, Threshold::Below(CRITICAL_FUEL_PERCENT))],
    },
    Rule {
        kind: ViolationKind::LowFuel,
        severity: Severity::High,
        subject: Metric::FuelLevel,
        conditions: &[
            Condition::new(Metric::FuelLevel, Threshold::AtLeast(CRITICAL_FUEL_PERCENT)),
            Condition::new(Metric::FuelLevel, Threshold::Below(LOW_FUEL_PERCENT)),
        ],
    },
    Rule {
        kind: ViolationKind::HighTemp,
        severity: Severity::High,
        subject: Metric::EngineTemp,
        conditions: &[
            Condition::new(Metric::EngineTemp, Threshold::Above(HIGH_TEMP_CELSIUS)),
            Condition::new(Metric::FuelLevel, Threshold::AtMost(HIGH_TEMP_SEVERITY_SPLIT)),
        ],
    },
    Rule {
        kind: ViolationKind::HighTemp,
        severity: Severity::Critical,
        subject: Metric::EngineTemp,
        conditions: &[
            Condition::new(Metric::EngineTemp, Threshold::Above(HIGH_TEMP_CELSIUS)),
            Condition::new(Metric::FuelLevel, Threshold::Above(HIGH_TEMP_SEVERITY_SPLIT)),
        ],
    },
    tire_rule(TirePosition::FrontLeft),
    tire_rule(TirePosition::FrontRight),
    tire_rule(TirePosition::RearLeft),
    tire_rule(TirePosition::RearRight),
];

/// Evaluate a reading against the rule table, stamping detection with the current time
pub fn evaluate(reading: &TelemetryReading) -> Vec<ViolationEvent> {
    evaluate_at(reading, Utc::now())
}

/// Evaluate a reading against the rule table
pub fn evaluate_at(reading: &TelemetryReading, detected_at: DateTime<Utc>) -> Vec<ViolationEvent> {
    RULES
        .iter()
        .filter(|rule| rule.matches(reading))
        .map(|rule| ViolationEvent {
            violation_id: Uuid::new_v4(),
            truck_id: reading.truck_id.clone(),
            driver_id: reading.driver_id.clone(),
            violation_type: rule.kind,
            severity: rule.severity,
            subject: Some(rule.subject),
            message: describe(rule, reading),
            original_data: reading.clone(),
            detected_at,
        })
        .collect()
}

fn describe(rule: &Rule, reading: &TelemetryReading) -> String {
    let value = rule.subject.value(reading);
    match rule.subject {
        Metric::Speed => format!(
            "Truck {} speeding at {} km/h (driver {})",
            reading.truck_id, value, reading.driver_id
        ),
        Metric::FuelLevel => format!("Truck {} low on fuel: {}%", reading.truck_id, value),
        Metric::EngineTemp => format!(
            "Truck {} engine temperature high: {} °C",
            reading.truck_id, value
        ),
        Metric::Tire(position) => format!(
            "Truck {} low tire pressure: {} tire at {} PSI",
            reading.truck_id,
            position.label(),
            value
        ),
    }
}
