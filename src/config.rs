use crate::prelude::*;

use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub serial: Serial,
    #[serde(default)]
    pub web: Web,
    #[serde(default)]
    pub monitoring: Monitoring,
    #[serde(default)]
    pub mqtt: Mqtt,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub error_codes: ErrorCodes,

    /// Where this config was read from, if anywhere.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

// Serial {{{
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct Serial {
    pub port: Option<String>,
    #[serde(default = "Config::default_baud_rate")]
    pub baud_rate: u32,
    /// A key left blank falls back to the default, like a missing one.
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub timeout: Option<Duration>,
}

impl Default for Serial {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: Config::default_baud_rate(),
            timeout: None,
        }
    }
}

impl Serial {
    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or_else(Config::default_serial_timeout)
    }
} // }}}

// Web {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Web {
    #[serde(default = "Config::default_web_port")]
    pub port: u16,
}

impl Default for Web {
    fn default() -> Self {
        Self {
            port: Config::default_web_port(),
        }
    }
}

impl Web {
    pub fn port(&self) -> u16 {
        self.port
    }
} // }}}

// Monitoring {{{
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct Monitoring {
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub interval: Option<Duration>,
    #[serde(default = "Config::default_max_errors")]
    pub max_errors: u32,
    #[serde(default)]
    pub use_modbus_parser: bool,
}

impl Default for Monitoring {
    fn default() -> Self {
        Self {
            interval: None,
            max_errors: Config::default_max_errors(),
            use_modbus_parser: false,
        }
    }
}

impl Monitoring {
    pub fn interval(&self) -> Duration {
        self.interval.unwrap_or_else(Config::default_interval)
    }

    pub fn max_errors(&self) -> u32 {
        self.max_errors
    }

    /// Whether responses are decoded with the fixed register map instead of range matching.
    pub fn use_register_map(&self) -> bool {
        self.use_modbus_parser
    }
} // }}}

// Mqtt {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Mqtt {
    #[serde(default)]
    pub enabled: bool,
    pub broker: Option<String>,
    #[serde(default = "Config::default_mqtt_port")]
    pub port: u16,
    #[serde(default = "Config::default_mqtt_topic")]
    pub topic: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for Mqtt {
    fn default() -> Self {
        Self {
            enabled: false,
            broker: None,
            port: Config::default_mqtt_port(),
            topic: Config::default_mqtt_topic(),
            username: None,
            password: None,
        }
    }
}

impl Mqtt {
    /// The broker to connect to. `enabled` without a broker means localhost;
    /// a broker given without `enabled` is still used.
    pub fn broker(&self) -> Option<&str> {
        match (self.broker.as_deref(), self.enabled) {
            (Some(broker), _) => Some(broker),
            (None, true) => Some("localhost"),
            (None, false) => None,
        }
    }

    pub fn active(&self) -> bool {
        self.broker().is_some()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
} // }}}

// Logging {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Logging {
    #[serde(default = "Config::default_log_level")]
    pub level: String,
    #[serde(default = "Config::default_log_file")]
    pub file: Option<String>,
    #[serde(default = "Config::default_enabled")]
    pub console: bool,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: Config::default_log_level(),
            file: Config::default_log_file(),
            console: true,
        }
    }
}

impl Logging {
    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn console(&self) -> bool {
        self.console
    }
} // }}}

// ErrorCodes {{{
/// Bit index to message, per bitmask.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ErrorCodes {
    #[serde(default)]
    pub inverter_error: BTreeMap<usize, String>,
    #[serde(default)]
    pub inverter_warning: BTreeMap<usize, String>,
    #[serde(default)]
    pub charger_error: BTreeMap<usize, String>,
    #[serde(default)]
    pub charger_warning: BTreeMap<usize, String>,
}

impl ErrorCodes {
    pub fn code_tables(&self) -> Result<CodeTables> {
        let table = |name: &str, entries: &BTreeMap<usize, String>| {
            CodeTable::from_entries(entries)
                .map_err(|err| anyhow!("config.rs:error_codes.{}: {}", name, err))
        };

        Ok(CodeTables {
            inverter_error: table("inverter_error", &self.inverter_error)?,
            inverter_warning: table("inverter_warning", &self.inverter_warning)?,
            charger_error: table("charger_error", &self.charger_error)?,
            charger_warning: table("charger_warning", &self.charger_warning)?,
        })
    }
} // }}}

impl Config {
    pub fn new(file: &Path) -> Result<Self> {
        info!("reading configuration from {}", file.display());
        let content = std::fs::read_to_string(file)
            .map_err(|err| anyhow!("config.rs:error reading {}: {}", file.display(), err))?;

        let mut config = Self::from_yaml(&content)
            .map_err(|err| anyhow!("config.rs:error parsing {}: {}", file.display(), err))?;
        config.source = Some(file.to_path_buf());

        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // an empty file is a valid, empty config
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Read `explicit` if given, else the first of the usual locations that exists.
    /// With neither, everything is defaulted.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        if let Some(file) = explicit {
            return Self::new(Path::new(file));
        }

        match Self::search_paths().into_iter().find(|p| p.exists()) {
            Some(file) => Self::new(&file),
            None => {
                debug!("no configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.yaml"), PathBuf::from("config.yml")];
        if let Some(home) = std::env::var_os("HOME") {
            paths.push(PathBuf::from(home).join(".ups_monitor/config.yaml"));
        }
        paths.push(PathBuf::from("/etc/ups_monitor/config.yaml"));
        paths
    }

    /// Overlay command line values; anything given there wins.
    pub fn apply_options(&mut self, options: &Options) {
        if let Some(port) = &options.port {
            self.serial.port = Some(port.clone());
        }
        if let Some(port) = options.web_port {
            self.web.port = port;
        }
        if let Some(interval) = options.interval {
            self.monitoring.interval = Some(Duration::from_secs(interval));
        }
        if let Some(max_errors) = options.max_errors {
            self.monitoring.max_errors = max_errors;
        }
        if options.use_modbus_parser {
            self.monitoring.use_modbus_parser = true;
        }
        if let Some(broker) = &options.mqtt_broker {
            self.mqtt.broker = Some(broker.clone());
        }
        if let Some(port) = options.mqtt_port {
            self.mqtt.port = port;
        }
        if let Some(topic) = &options.mqtt_topic {
            self.mqtt.topic = topic.clone();
        }
        if let Some(username) = &options.mqtt_username {
            self.mqtt.username = Some(username.clone());
        }
        if let Some(password) = &options.mqtt_password {
            self.mqtt.password = Some(password.clone());
        }
        if let Some(level) = &options.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Checks that only make sense once file and command line have been merged.
    pub fn validate(&self) -> Result<()> {
        let Some(port) = self.serial.port() else {
            bail!("config.rs:no serial port given; pass one as an argument or set serial.port");
        };
        if !Path::new(port).exists() {
            bail!("config.rs:serial port {} does not exist", port);
        }
        if self.serial.baud_rate == 0 {
            bail!("config.rs:serial.baud_rate must be greater than 0");
        }
        if self.web.port == 0 {
            bail!("config.rs:web.port must be between 1 and 65535");
        }
        if self.monitoring.interval().is_zero() {
            bail!("config.rs:monitoring.interval must be at least 1 second");
        }
        if self.monitoring.max_errors == 0 {
            bail!("config.rs:monitoring.max_errors must be at least 1");
        }
        if self.mqtt.active() && self.mqtt.port == 0 {
            bail!("config.rs:mqtt.port must be between 1 and 65535");
        }

        self.error_codes.code_tables()?;

        Ok(())
    }

    // Section accessors {{{
    pub fn serial(&self) -> &Serial {
        &self.serial
    }

    pub fn web(&self) -> &Web {
        &self.web
    }

    pub fn monitoring(&self) -> &Monitoring {
        &self.monitoring
    }

    pub fn mqtt(&self) -> &Mqtt {
        &self.mqtt
    }

    pub fn logging(&self) -> &Logging {
        &self.logging
    }

    pub fn error_codes(&self) -> &ErrorCodes {
        &self.error_codes
    } // }}}

    fn default_baud_rate() -> u32 {
        9600
    }

    fn default_serial_timeout() -> Duration {
        Duration::from_secs(2)
    }

    fn default_web_port() -> u16 {
        8080
    }

    fn default_interval() -> Duration {
        Duration::from_secs(30)
    }

    fn default_max_errors() -> u32 {
        5
    }

    fn default_mqtt_port() -> u16 {
        1883
    }

    fn default_mqtt_topic() -> String {
        "ups/telemetry".to_string()
    }

    fn default_log_level() -> String {
        "INFO".to_string()
    }

    fn default_log_file() -> Option<String> {
        Some("/tmp/ups_web_daemon.log".to_string())
    }

    fn default_enabled() -> bool {
        true
    }
}
