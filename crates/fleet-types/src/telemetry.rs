//! Telemetry reading types (inbound stream format)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Valid speed range (km/h)
pub const SPEED_RANGE: (f64, f64) = (0.0, 200.0);
/// Valid fuel level range (%)
pub const FUEL_RANGE: (f64, f64) = (0.0, 100.0);
/// Valid engine temperature range (°C)
pub const ENGINE_TEMP_RANGE: (f64, f64) = (0.0, 150.0);
/// Valid tire pressure range (PSI)
pub const TIRE_PRESSURE_RANGE: (f64, f64) = (20.0, 120.0);

/// GPS position of the truck
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Tire position on the truck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TirePosition {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl TirePosition {
    pub const ALL: [TirePosition; 4] = [
        TirePosition::FrontLeft,
        TirePosition::FrontRight,
        TirePosition::RearLeft,
        TirePosition::RearRight,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TirePosition::FrontLeft => "front left",
            TirePosition::FrontRight => "front right",
            TirePosition::RearLeft => "rear left",
            TirePosition::RearRight => "rear right",
        }
    }
}

/// Tire pressures in PSI
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TirePressure {
    pub front_left: f64,
    pub front_right: f64,
    pub rear_left: f64,
    pub rear_right: f64,
}

impl TirePressure {
    /// Same pressure on all four tires
    pub fn uniform(psi: f64) -> Self {
        Self {
            front_left: psi,
            front_right: psi,
            rear_left: psi,
            rear_right: psi,
        }
    }

    pub fn get(&self, position: TirePosition) -> f64 {
        match position {
            TirePosition::FrontLeft => self.front_left,
            TirePosition::FrontRight => self.front_right,
            TirePosition::RearLeft => self.rear_left,
            TirePosition::RearRight => self.rear_right,
        }
    }
}

/// One timestamped telemetry sample from a truck/driver pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryReading {
    pub truck_id: String,
    pub driver_id: String,
    /// km/h
    pub speed: f64,
    /// Percent of tank
    pub fuel_level: f64,
    /// °C
    pub engine_temp: f64,
    #[serde(default)]
    pub location: Option<Location>,
    pub tire_pressure: TirePressure,
    /// Capture time, epoch milliseconds on the wire
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl TelemetryReading {
    /// Check the producer-side contract: identifiers present and every metric in range.
    ///
    /// Readings failing this never reach the rule evaluator.
    pub fn validate(&self) -> Result<()> {
        if self.truck_id.trim().is_empty() {
            return Err(Error::InvalidReading("truckId is empty".to_string()));
        }
        if self.driver_id.trim().is_empty() {
            return Err(Error::InvalidReading("driverId is empty".to_string()));
        }
        check_range("speed", self.speed, SPEED_RANGE)?;
        check_range("fuelLevel", self.fuel_level, FUEL_RANGE)?;
        check_range("engineTemp", self.engine_temp, ENGINE_TEMP_RANGE)?;
        for position in TirePosition::ALL {
            check_range(
                position.label(),
                self.tire_pressure.get(position),
                TIRE_PRESSURE_RANGE,
            )?;
        }
        Ok(())
    }
}

fn check_range(field: &str, value: f64, (min, max): (f64, f64)) -> Result<()> {
    if value.is_nan() || value < min || value > max {
        return Err(Error::InvalidReading(format!(
            "{} = {} outside {}..={}",
            field, value, min, max
        )));
    }
    Ok(())
}
