//! Declarative rule table types

use fleet_types::{Metric, Severity, TelemetryReading, ViolationKind};

/// Comparison against a fixed threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    /// value > x
    Above(f64),
    /// value >= x
    AtLeast(f64),
    /// value < x
    Below(f64),
    /// value <= x
    AtMost(f64),
}

impl Threshold {
    pub fn holds(&self, value: f64) -> bool {
        match *self {
            Threshold::Above(x) => value > x,
            Threshold::AtLeast(x) => value >= x,
            Threshold::Below(x) => value < x,
            Threshold::AtMost(x) => value <= x,
        }
    }
}

/// One metric/threshold test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
    pub metric: Metric,
    pub threshold: Threshold,
}

impl Condition {
    pub const fn new(metric: Metric, threshold: Threshold) -> Self {
        Self { metric, threshold }
    }

    pub fn holds(&self, reading: &TelemetryReading) -> bool {
        self.threshold.holds(self.metric.value(reading))
    }
}

/// A rule fires when every condition holds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub kind: ViolationKind,
    pub severity: Severity,
    /// Metric reported as the breach subject
    pub subject: Metric,
    pub conditions: &'static [Condition],
}

impl Rule {
    pub fn matches(&self, reading: &TelemetryReading) -> bool {
        self.conditions.iter().all(|c| c.holds(reading))
    }
}
