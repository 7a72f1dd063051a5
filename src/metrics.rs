use crate::prelude::*;

use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

/// Gauges for the last published sample, held in their own registry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    input_voltage: Gauge,
    output_voltage: Gauge,
    battery_voltage: Gauge,
    battery_level: GaugeVec,
    load_percent: Gauge,
    load_power: Gauge,
    frequency: Gauge,
    input_frequency: Gauge,
    temperature: Gauge,
    status: GaugeVec,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let gauge = |name: &str, help: &str| -> Result<Gauge> {
            let g = Gauge::new(name, help)?;
            registry.register(Box::new(g.clone()))?;
            Ok(g)
        };
        let gauge_vec = |name: &str, help: &str| -> Result<GaugeVec> {
            let g = GaugeVec::new(Opts::new(name, help), &["status"])?;
            registry.register(Box::new(g.clone()))?;
            Ok(g)
        };

        Ok(Self {
            input_voltage: gauge("ups_input_voltage", "UPS input voltage (V)")?,
            output_voltage: gauge("ups_output_voltage", "UPS output voltage (V)")?,
            battery_voltage: gauge("ups_battery_voltage", "UPS battery voltage (V)")?,
            battery_level: gauge_vec("ups_battery_level", "UPS battery level (%)")?,
            load_percent: gauge("ups_load_percent", "UPS load (%)")?,
            load_power: gauge("ups_load_power", "UPS load power (W)")?,
            frequency: gauge("ups_frequency", "UPS output frequency (Hz)")?,
            input_frequency: gauge("ups_input_frequency", "UPS input frequency (Hz)")?,
            temperature: gauge("ups_temperature", "UPS temperature (C)")?,
            status: gauge_vec("ups_status", "UPS status (1 = online, 0 = on battery)")?,
            registry,
        })
    }

    pub fn update(&self, telemetry: &Telemetry) {
        let status = telemetry.status.as_str();

        self.input_voltage.set(telemetry.input_voltage);
        self.output_voltage.set(telemetry.output_voltage);
        self.battery_voltage.set(telemetry.battery_voltage);
        self.battery_level
            .with_label_values(&[status])
            .set(f64::from(telemetry.battery_level));
        self.load_percent.set(f64::from(telemetry.load_percent));
        self.load_power.set(f64::from(telemetry.load_power));
        self.frequency.set(telemetry.frequency);
        self.input_frequency.set(telemetry.input_frequency);
        self.temperature.set(f64::from(telemetry.temperature));
        self.status
            .with_label_values(&[status])
            .set(if telemetry.status.is_online() { 1.0 } else { 0.0 });
    }

    /// Prometheus text exposition of everything in the registry.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
