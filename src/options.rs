use clap::Parser;

/// UPS monitoring daemon: polls a UPS over serial and serves its telemetry
/// over HTTP, Prometheus and MQTT.
///
/// Anything given here overrides the config file.
#[derive(Debug, Default, Parser)]
#[clap(author, version)]
pub struct Options {
    /// Serial port the UPS is attached to (e.g. /dev/ttyUSB0)
    pub port: Option<String>,

    /// Config file to read; by default the first of config.yaml, config.yml,
    /// ~/.ups_monitor/config.yaml and /etc/ups_monitor/config.yaml that exists
    #[clap(short = 'c', long = "config")]
    pub config_file: Option<String>,

    /// Web server port
    #[clap(long)]
    pub web_port: Option<u16>,

    /// Polling interval in seconds
    #[clap(long)]
    pub interval: Option<u64>,

    /// Consecutive connection failures before giving up
    #[clap(long)]
    pub max_errors: Option<u32>,

    /// MQTT broker address; setting this enables MQTT
    #[clap(long)]
    pub mqtt_broker: Option<String>,

    #[clap(long)]
    pub mqtt_port: Option<u16>,

    #[clap(long)]
    pub mqtt_topic: Option<String>,

    #[clap(long)]
    pub mqtt_username: Option<String>,

    #[clap(long)]
    pub mqtt_password: Option<String>,

    /// Decode responses with the fixed register map instead of range matching
    #[clap(long)]
    pub use_modbus_parser: bool,

    /// Log level (DEBUG, INFO, WARNING, ERROR); RUST_LOG takes precedence
    #[clap(long)]
    pub log_level: Option<String>,
}

impl Options {
    pub fn new() -> Self {
        Self::parse()
    }
}
