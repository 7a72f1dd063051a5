pub mod alarms;
pub mod channels;
pub mod codec;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod mqtt;
pub mod options;
pub mod parser;
pub mod poller;
pub mod prelude;
pub mod state;
pub mod telemetry;
pub mod ups;
pub mod web;

use crate::prelude::*;

use crate::metrics::Metrics;
use crate::mqtt::Mqtt;
use crate::poller::Poller;
use crate::ups::{SerialTransport, Session, Timings};

use std::sync::Arc;
use std::time::Duration;

const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

const WEB_STOP_TIMEOUT: Duration = Duration::from_secs(3);
const POLLER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Merge config file and command line, then check the result.
pub fn load_config(options: &Options) -> Result<Config> {
    let mut config = Config::load(options.config_file.as_deref())?;
    config.apply_options(options);
    config.validate()?;
    Ok(config)
}

pub async fn app() -> Result<()> {
    let options = Options::new();

    let config = load_config(&options)?;

    logging::init(config.logging())?;

    info!("ups-bridge {} starting", CARGO_PKG_VERSION);
    log_config(&config);

    run(config).await
}

fn log_config(config: &Config) {
    if let Some(source) = &config.source {
        info!("  config file: {}", source.display());
    }
    info!("  serial port: {}", config.serial().port().unwrap_or_default());
    info!("  web interface: http://0.0.0.0:{}", config.web().port());
    info!(
        "  polling interval: {}s",
        config.monitoring().interval().as_secs()
    );
    match config.mqtt().broker() {
        Some(broker) => {
            info!("  mqtt broker: {}:{}", broker, config.mqtt().port());
            info!("  mqtt topic: {}", config.mqtt().topic());
        }
        None => info!("  mqtt: disabled"),
    }
    info!("  log level: {}", config.logging().level());
    if let Some(file) = config.logging().file() {
        info!("  log file: {}", file);
    }
}

/// Run the daemon with a validated config until a signal or a fatal poller error.
pub async fn run(config: Config) -> Result<()> {
    let state = Arc::new(State::new());
    let channels = Channels::new();
    let metrics = Metrics::new()?;

    let parser = Parser::new(
        config.monitoring().use_register_map(),
        config.error_codes().code_tables()?,
    );

    let mqtt = config
        .mqtt()
        .active()
        .then(|| Mqtt::new(config.mqtt().clone(), channels.clone()));

    let mqtt_handle = mqtt.clone().map(|mqtt| {
        tokio::spawn(async move {
            if let Err(e) = mqtt.start().await {
                error!("MQTT task failed: {:#}", e);
            }
        })
    });

    let web = web::Web {
        state: state.clone(),
        metrics: metrics.clone(),
        thresholds: Thresholds::default(),
        interval_secs: config.monitoring().interval().as_secs(),
    };
    let web_port = config.web().port();
    let web_state = state.clone();
    let web_handle = tokio::spawn(async move {
        let result = web::serve(web, web_port).await;
        if result.is_err() {
            web_state.stop();
        }
        result
    });

    let mut poller = Poller::new(
        Session::new(SerialTransport::from_config(&config), Timings::default()),
        state.clone(),
        parser,
        metrics,
        channels.clone(),
        config.monitoring().interval(),
        config.monitoring().max_errors(),
    );
    let poller_handle = tokio::spawn(async move { poller.start().await });

    tokio::spawn(signal_handler(state.clone()));

    state.stopped().await;
    info!("shutting down");

    if let Some(mqtt) = &mqtt {
        mqtt.stop();
    }

    let mut result = Ok(());

    match tokio::time::timeout(WEB_STOP_TIMEOUT, web_handle).await {
        Ok(Ok(Err(e))) => {
            error!("web server failed: {:#}", e);
            result = Err(e);
        }
        Ok(Err(e)) => error!("web server task: {}", e),
        Ok(Ok(Ok(()))) => {}
        Err(_) => warn!(
            "web server did not stop within {}s",
            WEB_STOP_TIMEOUT.as_secs()
        ),
    }

    match tokio::time::timeout(POLLER_STOP_TIMEOUT, poller_handle).await {
        Ok(Ok(Err(e))) => {
            error!("{:#}", e);
            result = Err(e);
        }
        Ok(Err(e)) => error!("poller task: {}", e),
        Ok(Ok(Ok(()))) => {}
        Err(_) => warn!(
            "poller did not stop within {}s",
            POLLER_STOP_TIMEOUT.as_secs()
        ),
    }

    if let Some(handle) = mqtt_handle {
        if tokio::time::timeout(Duration::from_secs(1), handle).await.is_err() {
            warn!("mqtt did not stop in time");
        }
    }

    info!("shutdown complete");
    result
}

async fn signal_handler(state: Arc<State>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
        _ = state.stopped() => return,
    }

    state.stop();
}
