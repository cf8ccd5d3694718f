//! API Regression Tests
//!
//! In-process tests that build the Axum app via `create_app()` and exercise
//! all /api/v1/* endpoints using `tower::ServiceExt::oneshot()`.
//! No binary spawn and no network port, so it runs in CI without `#[ignore]`.

use riverwatch::api::{create_app, ApiState};
use riverwatch::config::{DashboardConfig, ReportsConfig};
use riverwatch::Dashboard;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// A dashboard that was never started: buffer empty, state `loading`.
fn fresh_dashboard() -> Arc<Dashboard> {
    let mut config = DashboardConfig::default();
    config.reports = ReportsConfig::immediate();
    config.telemetry.seed = Some(5);
    Arc::new(Dashboard::new(config))
}

fn app(dashboard: &Arc<Dashboard>) -> Router {
    create_app(ApiState::new(Arc::clone(dashboard)))
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

async fn json_body(resp: Response) -> Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn report_request(format: &str, selected: bool) -> Value {
    json!({
        "variables": [
            { "id": "flow", "name": "Flujo", "unit": "m³/s", "selected": selected },
            { "id": "level", "name": "Nivel", "unit": "m", "selected": selected }
        ],
        "format": format,
        "date_range": {
            "start": "2024-05-01T00:00:00Z",
            "end": "2024-05-03T00:00:00Z"
        },
        "ai_analysis": true
    })
}

// ============================================================================
// Telemetry endpoints
// ============================================================================

/// All v1 GET endpoints should return 200 on a fresh dashboard.
#[tokio::test]
async fn test_v1_get_endpoints_return_200() {
    let dashboard = fresh_dashboard();
    let endpoints = [
        "/api/v1/health",
        "/api/v1/telemetry",
        "/api/v1/telemetry/status",
        "/api/v1/telemetry/latest",
        "/api/v1/telemetry/window/30m",
        "/api/v1/telemetry/window/24h",
        "/api/v1/metrics",
        "/api/v1/metrics/flow/sparkline",
        "/api/v1/metrics/velocity/sparkline",
        "/api/v1/temperature",
        "/api/v1/reports",
        "/api/v1/reports/variables",
    ];

    for endpoint in &endpoints {
        let resp = get(app(&dashboard), endpoint).await;
        assert_eq!(
            resp.status(),
            StatusCode::OK,
            "GET {endpoint} returned status {}",
            resp.status()
        );
    }
}

/// Every success body carries the `{data, meta}` envelope.
#[tokio::test]
async fn test_v1_health_reports_loading_state() {
    let dashboard = fresh_dashboard();
    let json = json_body(get(app(&dashboard), "/api/v1/health").await).await;

    assert_eq!(json["data"]["status"], "loading");
    assert_eq!(json["data"]["load_state"]["state"], "loading");
    assert_eq!(json["meta"]["version"], "1");
    assert!(json["meta"]["timestamp"].is_string());
}

#[tokio::test]
async fn test_v1_latest_is_zero_sentinel_before_load() {
    let dashboard = fresh_dashboard();
    let json = json_body(get(app(&dashboard), "/api/v1/telemetry/latest").await).await;
    assert_eq!(json["data"]["station1"], 0.0);
    assert_eq!(json["data"]["station2"], 0.0);

    let json = json_body(get(app(&dashboard), "/api/v1/telemetry/status").await).await;
    assert_eq!(json["data"]["len"], 0);
    assert_eq!(json["data"]["capacity"], 1441);
}

#[tokio::test]
async fn test_v1_window_and_metric_errors() {
    let dashboard = fresh_dashboard();

    let resp = get(app(&dashboard), "/api/v1/telemetry/window/2h").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = json_body(resp).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");

    let resp = get(app(&dashboard), "/api/v1/metrics/pressure/sparkline").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_v1_variables_catalog() {
    let dashboard = fresh_dashboard();
    let json = json_body(get(app(&dashboard), "/api/v1/reports/variables").await).await;
    let vars = json["data"].as_array().unwrap();
    assert_eq!(vars.len(), 5);
    assert_eq!(vars[0]["id"], "flow");
    assert_eq!(vars[0]["selected"], true);
    assert_eq!(vars[4]["id"], "temperature");
    assert_eq!(vars[4]["selected"], false);
}

// ============================================================================
// Report endpoints
// ============================================================================

#[tokio::test]
async fn test_v1_submit_without_variables_is_400() {
    let dashboard = fresh_dashboard();
    let resp = send(app(&dashboard), "POST", "/api/v1/reports", Some(report_request("csv", false))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = json_body(resp).await;
    assert_eq!(json["error"]["message"], "no variables selected");

    assert!(dashboard.list_jobs().await.is_empty());
}

#[tokio::test]
async fn test_v1_submit_malformed_body_is_400() {
    let dashboard = fresh_dashboard();
    let resp = send(app(&dashboard), "POST", "/api/v1/reports", Some(json!({ "format": "csv" }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_v1_submit_then_download() {
    let dashboard = fresh_dashboard();
    let resp = send(app(&dashboard), "POST", "/api/v1/reports", Some(report_request("csv", true))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = json_body(resp).await;
    let id = json["data"]["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("report_"));

    let job = dashboard.wait_for_report(&id).await.unwrap();
    assert_eq!(job.progress, 100);

    let json = json_body(get(app(&dashboard), &format!("/api/v1/reports/{id}")).await).await;
    assert_eq!(json["data"]["status"], "completed");

    let resp = get(app(&dashboard), &format!("/api/v1/reports/{id}/download")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"reporte_tabular_"));
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert!(body.starts_with(b"fecha,hora,flow_Estacion1,flow_Estacion2,level_Estacion1,level_Estacion2"));

    let json = json_body(get(app(&dashboard), "/api/v1/reports").await).await;
    assert_eq!(json["data"]["jobs"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"]["is_generating"], false);
}

#[tokio::test]
async fn test_v1_unknown_report_is_404() {
    let dashboard = fresh_dashboard();
    for (method, uri) in [
        ("GET", "/api/v1/reports/report_0_abcdef012"),
        ("DELETE", "/api/v1/reports/report_0_abcdef012"),
        ("POST", "/api/v1/reports/report_0_abcdef012/cancel"),
        ("GET", "/api/v1/reports/report_0_abcdef012/download"),
    ] {
        let resp = send(app(&dashboard), method, uri, None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{method} {uri}");
    }
}

#[tokio::test]
async fn test_v1_failed_job_survives_clear_completed() {
    let dashboard = fresh_dashboard();

    let resp = send(app(&dashboard), "POST", "/api/v1/reports", Some(report_request("csv", true))).await;
    let ok_id = json_body(resp).await["data"]["id"].as_str().unwrap().to_string();
    let resp = send(app(&dashboard), "POST", "/api/v1/reports", Some(report_request("docx", true))).await;
    let bad_id = json_body(resp).await["data"]["id"].as_str().unwrap().to_string();

    dashboard.wait_for_report(&ok_id).await.unwrap();
    let failed = dashboard.wait_for_report(&bad_id).await.unwrap();
    assert_eq!(failed.error.as_deref(), Some("Formato no soportado: docx"));

    let resp = get(app(&dashboard), &format!("/api/v1/reports/{bad_id}/download")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let json = json_body(send(app(&dashboard), "DELETE", "/api/v1/reports/completed", None).await).await;
    assert_eq!(json["data"]["removed"], 1);

    let json = json_body(get(app(&dashboard), "/api/v1/reports").await).await;
    let jobs = json["data"]["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["id"], bad_id.as_str());
    assert_eq!(jobs[0]["status"], "error");

    let json = json_body(send(app(&dashboard), "DELETE", &format!("/api/v1/reports/{bad_id}"), None).await).await;
    assert_eq!(json["data"]["deleted"], true);
    assert!(dashboard.list_jobs().await.is_empty());
}

#[tokio::test]
async fn test_v1_period_at_calendar_end_fails_job_not_server() {
    let dashboard = fresh_dashboard();
    let mut request = report_request("csv", true);
    request["date_range"] = json!({
        "start": "+262142-12-31T11:59:59.999999999Z",
        "end": "+262142-12-31T23:59:59.999999999Z"
    });

    let resp = send(app(&dashboard), "POST", "/api/v1/reports", Some(request)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let id = json_body(resp).await["data"]["id"].as_str().unwrap().to_string();

    let job = dashboard.wait_for_report(&id).await.unwrap();
    assert!(job.error.as_deref().unwrap().contains("fuera de rango"));

    let json = json_body(get(app(&dashboard), "/api/v1/reports").await).await;
    assert_eq!(json["data"]["is_generating"], false);
    assert_eq!(json["data"]["jobs"][0]["status"], "error");
}
