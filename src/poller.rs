use crate::prelude::*;

use crate::metrics::Metrics;
use crate::ups::{Command, Session, Transport};

use std::sync::Arc;
use std::time::Duration;

pub struct Poller<T> {
    session: Session<T>,
    state: Arc<State>,
    parser: Parser,
    metrics: Metrics,
    channels: Channels,
    thresholds: Thresholds,
    interval: Duration,
    max_errors: u32,
    gave_up: bool,
}

impl<T: Transport> Poller<T> {
    pub fn new(
        session: Session<T>,
        state: Arc<State>,
        parser: Parser,
        metrics: Metrics,
        channels: Channels,
        interval: Duration,
        max_errors: u32,
    ) -> Self {
        Self {
            session,
            state,
            parser,
            metrics,
            channels,
            thresholds: Thresholds::default(),
            interval,
            max_errors,
            gave_up: false,
        }
    }

    /// Poll until the daemon is stopped. Only fails once the connection error budget is spent.
    pub async fn start(&mut self) -> Result<()> {
        info!(
            "polling every {}s using the {} parser",
            self.interval.as_secs(),
            self.parser.name()
        );

        while self.state.is_running() {
            if let Err(err) = self.cycle().await {
                if !self.state.is_running() {
                    break;
                }
                error!("{:#}", err);
                self.session.close().await;
                self.pause(self.session.timings().cycle_retry).await;
            }
        }

        self.session.close().await;
        info!("poller stopped");

        if self.gave_up {
            bail!(
                "poller.rs:giving up after {} connection errors",
                self.state.connection_errors()
            );
        }

        Ok(())
    }

    /// One pass: connect if needed, wake the UPS, read and publish, then wait for the next.
    pub async fn cycle(&mut self) -> Result<()> {
        if !self.session.is_open() && !self.connect().await {
            return Ok(());
        }

        if let Err(err) = self.session.wake_up().await {
            warn!("wakeup failed: {}", err);
            error!("could not wake up UPS, reconnecting");
            self.session.close().await;
            self.pause(self.session.timings().cycle_retry).await;
            return Ok(());
        }

        let telemetry = self.read_telemetry().await;

        if telemetry.has_readings() {
            self.publish(telemetry)?;
        } else {
            warn!("no telemetry obtained");
        }

        self.sleep_interval().await;

        Ok(())
    }

    // returns whether the session is now open
    async fn connect(&mut self) -> bool {
        match self.session.open().await {
            Ok(()) => {
                self.state.reset_connection_errors();
                true
            }
            Err(err) => {
                let errors = self.state.record_connection_error();
                error!("connection failed: {:#}", err);

                if errors >= self.max_errors {
                    error!("too many connection errors, shutting down");
                    self.gave_up = true;
                    self.state.stop();
                    return false;
                }

                warn!(
                    "retrying in {}s",
                    self.session.timings().connect_retry.as_secs()
                );
                self.pause(self.session.timings().connect_retry).await;
                false
            }
        }
    }

    async fn query(&mut self, command: Command) -> Option<Vec<u8>> {
        match self.session.query(command).await {
            Ok(response) if response.is_empty() => None,
            Ok(response) => Some(response),
            Err(err) => {
                error!("{} command failed: {}", command.description(), err);
                None
            }
        }
    }

    /// Main parameters, topped up from the battery command if they lacked a battery voltage.
    pub async fn read_telemetry(&mut self) -> Telemetry {
        let capture = self.state.capture();

        let mut telemetry = match self.query(Command::MainParameters).await {
            Some(response) => self.parser.parse(&response, &capture),
            None => Telemetry::empty(&capture),
        };

        if telemetry.battery_voltage == 0.0 {
            if let Some(response) = self.query(Command::Battery).await {
                let battery = self.parser.parse(&response, &capture);
                telemetry = telemetry.merge_battery(&battery);
            }
        }

        telemetry
    }

    fn publish(&self, telemetry: Telemetry) -> Result<()> {
        self.metrics.update(&telemetry);

        let message = mqtt::Message::for_telemetry(&telemetry)?;
        // no subscribers when mqtt is off
        let _ = self
            .channels
            .to_mqtt
            .send(mqtt::ChannelData::Message(message));

        info!(
            "telemetry: Vin={:.1}V, Vout={:.1}V, Batt={:.1}V, Load={}%",
            telemetry.input_voltage,
            telemetry.output_voltage,
            telemetry.battery_voltage,
            telemetry.load_percent
        );

        for alarm in alarms::check(&telemetry, &self.thresholds) {
            warn!("alarm: {}", alarm);
        }

        if let Some(extended) = &telemetry.extended {
            if extended.error_message != "No errors" {
                warn!("device errors: {}", extended.error_message);
            }
            if extended.warning_message != "No errors" {
                warn!("device warnings: {}", extended.warning_message);
            }
        }

        self.state.publish(telemetry);

        Ok(())
    }

    async fn sleep_interval(&self) {
        let tick = self.session.timings().tick;
        if tick.is_zero() {
            return;
        }

        let mut remaining = self.interval;
        while !remaining.is_zero() && self.state.is_running() {
            let step = remaining.min(tick);
            tokio::time::sleep(step).await;
            remaining -= step;
        }
    }

    async fn pause(&self, duration: Duration) {
        if duration.is_zero() || !self.state.is_running() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.state.stopped() => {}
        }
    }
}
