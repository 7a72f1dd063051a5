use serde::Serialize;

/// Input voltage above which the UPS is considered to be running from the grid.
pub const ONLINE_VOLTAGE_THRESHOLD: f64 = 200.0;

// Status {{{
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Online,
    Battery,
    #[default]
    Unknown,
}

impl Status {
    pub fn from_input_voltage(input_voltage: f64) -> Self {
        if input_voltage > ONLINE_VOLTAGE_THRESHOLD {
            Status::Online
        } else {
            Status::Battery
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Online => "online",
            Status::Battery => "battery",
            Status::Unknown => "unknown",
        }
    }

    pub fn is_online(&self) -> bool {
        *self == Status::Online
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
} // }}}

// Capture {{{
/// When a response was captured, and how long the daemon had been up at the time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Capture {
    pub timestamp: String,
    pub uptime: String,
}

impl Capture {
    pub fn now(started: std::time::Instant) -> Self {
        Self {
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            uptime: format_uptime(started.elapsed()),
        }
    }
}

pub fn format_uptime(elapsed: std::time::Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
} // }}}

// Telemetry {{{
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Telemetry {
    pub input_voltage: f64,
    pub output_voltage: f64,
    pub battery_voltage: f64,
    pub battery_level: i32,
    pub load_percent: i32,
    pub load_power: i32,
    pub frequency: f64,
    pub input_frequency: f64,
    pub temperature: i32,
    pub timestamp: String,
    pub status: Status,
    pub uptime: String,

    /// Only filled in by the register map parser.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub extended: Option<ExtendedTelemetry>,
}

impl Telemetry {
    /// An empty sample stamped with `capture`; status is derived like any other sample.
    pub fn empty(capture: &Capture) -> Self {
        Self {
            timestamp: capture.timestamp.clone(),
            uptime: capture.uptime.clone(),
            ..Default::default()
        }
        .with_derived_status()
    }

    pub fn with_derived_status(mut self) -> Self {
        self.status = Status::from_input_voltage(self.input_voltage);
        self
    }

    /// Whether this sample carries anything worth publishing.
    pub fn has_readings(&self) -> bool {
        self.input_voltage > 0.0 || self.battery_voltage > 0.0
    }

    /// Take battery voltage and level from a supplementary battery reading, where present.
    pub fn merge_battery(self, battery: &Telemetry) -> Self {
        let mut merged = self;
        if battery.battery_voltage > 0.0 {
            merged.battery_voltage = battery.battery_voltage;
        }
        if battery.battery_level > 0 {
            merged.battery_level = battery.battery_level;
        }
        merged
    }
}
// }}}

// ExtendedTelemetry {{{
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ExtendedTelemetry {
    pub grid_voltage: f64,
    pub bus_voltage: f64,
    pub inverter_current: f64,
    pub grid_current: f64,
    pub load_current: f64,
    pub inverter_power: i32,
    pub grid_power: i32,
    pub work_state: i32,
    pub error_message: String,
    pub warning_message: String,
}
// }}}
