//! Range-matching decoder.
//!
//! The device doesn't document its response layout, so each 16-bit value is
//! matched against windows where a given quantity has been observed to fall.
//! Values outside all windows are dropped.

use crate::prelude::*;

use std::ops::RangeInclusive;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Voltage,
    Frequency,
    BatteryVoltage,
    BatteryLevel,
    LoadPercent,
    LoadPower,
    Temperature,
}

/// Evaluated in order; ranges overlap and the first match wins.
pub const RANGE_RULES: [(RangeInclusive<u16>, Field); 7] = [
    (2200..=2300, Field::Voltage),
    (490..=510, Field::Frequency),
    (130..=140, Field::BatteryVoltage),
    (95..=105, Field::BatteryLevel),
    (10..=20, Field::LoadPercent),
    (130..=150, Field::LoadPower),
    (30..=40, Field::Temperature),
];

pub fn classify_value(value: u16) -> Option<Field> {
    RANGE_RULES
        .iter()
        .find(|(range, _)| range.contains(&value))
        .map(|(_, field)| *field)
}

/// Output and input voltage share a window. The device sends output first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoltageSlot {
    #[default]
    AwaitingOutput,
    AwaitingInput,
    Done,
}

impl VoltageSlot {
    /// Store `volts` in whichever voltage is due and return the next state.
    pub fn assign(self, volts: f64, telemetry: &mut Telemetry) -> Self {
        match self {
            VoltageSlot::AwaitingOutput => {
                telemetry.output_voltage = volts;
                VoltageSlot::AwaitingInput
            }
            VoltageSlot::AwaitingInput => {
                telemetry.input_voltage = volts;
                VoltageSlot::Done
            }
            VoltageSlot::Done => VoltageSlot::Done,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicParser;

impl HeuristicParser {
    pub fn classify(&self, data: &[u8], capture: &Capture) -> Telemetry {
        let mut telemetry = Telemetry::empty(capture);

        if data.len() < codec::HEADER_LEN {
            return telemetry;
        }

        let mut voltage = VoltageSlot::default();

        for value in codec::value_stream(codec::payload(data)) {
            let Some(field) = classify_value(value) else {
                trace!("unclassified value {}", value);
                continue;
            };

            match field {
                Field::Voltage => voltage = voltage.assign(f64::from(value) / 10.0, &mut telemetry),
                Field::Frequency => {
                    telemetry.frequency = f64::from(value) / 10.0;
                    telemetry.input_frequency = telemetry.frequency;
                }
                Field::BatteryVoltage => telemetry.battery_voltage = f64::from(value) / 10.0,
                Field::BatteryLevel => telemetry.battery_level = i32::from(value),
                Field::LoadPercent => telemetry.load_percent = i32::from(value),
                Field::LoadPower => telemetry.load_power = i32::from(value),
                Field::Temperature => telemetry.temperature = i32::from(value),
            }
        }

        telemetry.with_derived_status()
    }
}

impl Decode for HeuristicParser {
    fn decode(&self, data: &[u8], capture: &Capture) -> Result<Telemetry> {
        Ok(self.classify(data, capture))
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}
