mod common;
use common::*;
use ups_bridge::metrics::Metrics;
use ups_bridge::prelude::*;
use ups_bridge::web::{self, Web};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

fn app(telemetry: Option<Telemetry>) -> (Web, axum::Router) {
    let state = Arc::new(State::new());
    let metrics = Metrics::new().unwrap();
    if let Some(t) = telemetry {
        metrics.update(&t);
        state.publish(t);
    }

    let web = Web {
        state,
        metrics,
        thresholds: Thresholds::default(),
        interval_secs: 30,
    };
    (web.clone(), web::router(web))
}

async fn get(router: axum::Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, headers, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn dashboard_renders() {
    let (_, router) = app(Some(Factory::telemetry()));

    let (status, headers, body) = get(router, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert!(body.contains("UPS Monitor"));
    assert!(body.contains("ONLINE"));
    assert!(body.contains("228.0"));
    assert!(body.contains("Data updates every 30 seconds"));
    assert!(!body.contains("class=\"alarm\""));
}

#[tokio::test]
async fn dashboard_shows_alarms() {
    let (_, router) = app(Some(Telemetry {
        input_voltage: 150.0,
        status: Status::Battery,
        ..Factory::telemetry()
    }));

    let (_, _, body) = get(router, "/").await;

    assert!(body.contains("BATTERY"));
    assert!(body.contains("low input voltage"));
}

#[tokio::test]
async fn battery_bar_styles_stay_off_the_status_banner() {
    let (_, router) = app(Some(Telemetry {
        input_voltage: 0.0,
        battery_level: 40,
        status: Status::Battery,
        ..Factory::telemetry()
    }));

    let (_, _, body) = get(router, "/").await;

    assert!(body.contains("class=\"status battery\""));
    assert!(body.contains("class=\"battery-bar\""));
    assert!(!body.contains(".battery {"));
    assert!(body.contains("#2ecc71 40%"));
}

#[tokio::test]
async fn dashboard_before_first_sample() {
    let (_, router) = app(None);

    let (status, _, body) = get(router, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("0.0"));
}

#[tokio::test]
async fn telemetry_api() -> Result<()> {
    let (_, router) = app(Some(Telemetry {
        load_percent: 90,
        ..Factory::telemetry()
    }));

    let (status, headers, body) = get(router, "/api/telemetry").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");

    let json: serde_json::Value = serde_json::from_str(&body)?;
    assert_eq!(json["input_voltage"], 228.0);
    assert_eq!(json["load_percent"], 90);
    assert_eq!(json["status"], "online");
    assert_eq!(json["timestamp"], "2024-03-01 12:00:00");
    assert_eq!(json["alarms"], serde_json::json!(["high load"]));

    Ok(())
}

#[tokio::test]
async fn telemetry_api_defaults_to_unknown() -> Result<()> {
    let (_, router) = app(None);

    let (_, _, body) = get(router, "/api/telemetry").await;

    let json: serde_json::Value = serde_json::from_str(&body)?;
    assert_eq!(json["status"], "unknown");
    assert_eq!(json["alarms"], serde_json::json!([]));

    Ok(())
}

#[tokio::test]
async fn health() -> Result<()> {
    let (_, router) = app(None);

    let (status, _, body) = get(router, "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body)?;
    assert_eq!(json["status"], "running");
    assert_eq!(json["uptime"], "00:00:00");
    // 2024-03-01T12:00:00.123456
    assert_eq!(json["timestamp"].as_str().unwrap().len(), 26);
    assert_eq!(&json["timestamp"].as_str().unwrap()[10..11], "T");

    Ok(())
}

#[tokio::test]
async fn metrics_exposition() {
    let (_, router) = app(Some(Factory::telemetry()));

    let (status, headers, body) = get(router, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], prometheus::TEXT_FORMAT);
    for name in [
        "ups_input_voltage",
        "ups_output_voltage",
        "ups_battery_voltage",
        "ups_battery_level",
        "ups_load_percent",
        "ups_load_power",
        "ups_frequency",
        "ups_input_frequency",
        "ups_temperature",
        "ups_status",
    ] {
        assert!(body.contains(&format!("# TYPE {} gauge", name)), "{}", name);
    }
    assert!(body.contains("ups_battery_level{status=\"online\"} 100"));
    assert!(body.contains("ups_status{status=\"online\"} 1"));
}

#[tokio::test]
async fn unknown_path_is_404() {
    let (_, router) = app(None);

    let (status, _, body) = get(router, "/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "404 Not Found");
}

#[tokio::test]
async fn serve_stops_on_shutdown() -> Result<()> {
    let (web, _) = app(None);
    let state = web.state.clone();

    let handle = tokio::spawn(web::serve(web, 0));
    state.stop();

    tokio::time::timeout(std::time::Duration::from_secs(5), handle).await???;
    Ok(())
}
