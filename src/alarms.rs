use crate::prelude::*;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Alarm {
    #[serde(rename = "low input voltage")]
    LowInputVoltage,
    #[serde(rename = "low battery")]
    LowBattery,
    #[serde(rename = "over temperature")]
    OverTemperature,
    #[serde(rename = "high load")]
    HighLoad,
}

impl Alarm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Alarm::LowInputVoltage => "low input voltage",
            Alarm::LowBattery => "low battery",
            Alarm::OverTemperature => "over temperature",
            Alarm::HighLoad => "high load",
        }
    }
}

impl std::fmt::Display for Alarm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    pub min_input_voltage: f64,
    pub min_battery_level: i32,
    pub max_temperature: i32,
    pub max_load_percent: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_input_voltage: 180.0,
            min_battery_level: 20,
            max_temperature: 40,
            max_load_percent: 80,
        }
    }
}

/// Alarms raised by `telemetry`, in a fixed order.
///
/// Zero input voltage and zero battery level mean "not read" and never alarm.
/// Temperature has no such guard.
pub fn check(telemetry: &Telemetry, thresholds: &Thresholds) -> Vec<Alarm> {
    let mut alarms = Vec::new();

    if telemetry.input_voltage > 0.0 && telemetry.input_voltage < thresholds.min_input_voltage {
        alarms.push(Alarm::LowInputVoltage);
    }
    if telemetry.battery_level > 0 && telemetry.battery_level < thresholds.min_battery_level {
        alarms.push(Alarm::LowBattery);
    }
    if telemetry.temperature > thresholds.max_temperature {
        alarms.push(Alarm::OverTemperature);
    }
    if telemetry.load_percent > thresholds.max_load_percent {
        alarms.push(Alarm::HighLoad);
    }

    alarms
}
