use crate::prelude::*;

use std::fs::OpenOptions;
use std::io::{self, Write};

/// Map config level names (DEBUG, INFO, WARNING, ...) onto `log` filter directives.
pub fn filter_for(level: &str) -> &'static str {
    match level.to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "WARNING" | "WARN" => "warn",
        "ERROR" | "CRITICAL" | "FATAL" => "error",
        "OFF" => "off",
        _ => "info",
    }
}

/// Writes everything to each of its sinks.
pub struct Tee {
    sinks: Vec<Box<dyn Write + Send>>,
}

impl Tee {
    pub fn new(sinks: Vec<Box<dyn Write + Send>>) -> Self {
        Self { sinks }
    }
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for sink in &mut self.sinks {
            sink.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }
}

/// Set up the global logger from the `logging` section. Call once.
pub fn init(config: &config::Logging) -> Result<()> {
    let mut sinks: Vec<Box<dyn Write + Send>> = Vec::new();
    let mut file_error = None;

    if let Some(path) = config.file() {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => sinks.push(Box::new(file)),
            // reported once the logger is up
            Err(err) => file_error = Some(format!("cannot open log file {}: {}", path, err)),
        }
    }
    if config.console() || sinks.is_empty() {
        sinks.push(Box::new(io::stderr()));
    }

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(filter_for(config.level())),
    )
    .format(|buf, record| {
        writeln!(
            buf,
            "[{} {} {}] {}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
            record.level(),
            record.module_path().unwrap_or(""),
            record.args()
        )
    })
    .write_style(env_logger::WriteStyle::Never)
    .target(env_logger::Target::Pipe(Box::new(Tee::new(sinks))))
    .try_init()?;

    if let Some(err) = file_error {
        warn!("{}", err);
    }

    Ok(())
}
