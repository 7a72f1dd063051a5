use crate::prelude::*;

use crate::metrics::Metrics;

use askama::Template;
use axum::{
    extract,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Everything a request handler needs.
#[derive(Clone)]
pub struct Web {
    pub state: Arc<State>,
    pub metrics: Metrics,
    pub thresholds: Thresholds,
    pub interval_secs: u64,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct Dashboard<'a> {
    telemetry: &'a Telemetry,
    alarms: &'a [Alarm],
    battery_fill: i32,
    interval: u64,
}

#[derive(Serialize)]
struct TelemetryResponse<'a> {
    #[serde(flatten)]
    telemetry: &'a Telemetry,
    alarms: Vec<Alarm>,
}

pub fn router(web: Web) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/api/telemetry", get(telemetry))
        .route("/api/health", get(health))
        .route("/metrics", get(metrics))
        .fallback(not_found)
        .with_state(web)
}

/// Serve `web` on `port` until the daemon stops.
pub async fn serve(web: Web, port: u16) -> Result<()> {
    let state = web.state.clone();
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|err| anyhow!("web.rs:cannot listen on port {}: {}", port, err))?;

    info!("web interface at http://0.0.0.0:{}", port);

    axum::serve(listener, router(web))
        .with_graceful_shutdown(async move { state.stopped().await })
        .await?;

    info!("web server stopped");
    Ok(())
}

fn internal_error(err: impl std::fmt::Display) -> Response {
    error!("request failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "Internal server error" })),
    )
        .into_response()
}

async fn dashboard(extract::State(web): extract::State<Web>) -> Response {
    let telemetry = web.state.telemetry();
    let alarms = alarms::check(&telemetry, &web.thresholds);

    let page = Dashboard {
        telemetry: &telemetry,
        alarms: &alarms,
        battery_fill: telemetry.battery_level.clamp(0, 100),
        interval: web.interval_secs,
    };

    match page.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => internal_error(err),
    }
}

async fn telemetry(extract::State(web): extract::State<Web>) -> Response {
    let telemetry = web.state.telemetry();
    let body = TelemetryResponse {
        alarms: alarms::check(&telemetry, &web.thresholds),
        telemetry: &telemetry,
    };

    (
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(body),
    )
        .into_response()
}

async fn health(extract::State(web): extract::State<Web>) -> Response {
    Json(serde_json::json!({
        "status": "running",
        "uptime": web.state.uptime(),
        "timestamp": chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
    }))
    .into_response()
}

async fn metrics(extract::State(web): extract::State<Web>) -> Response {
    match web.metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(err) => internal_error(err),
    }
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 Not Found").into_response()
}
