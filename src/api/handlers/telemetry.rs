//! Telemetry endpoints: buffer, windows, metrics, sparklines, temperature

use axum::extract::{Path, State};
use axum::response::Response;
use serde::Serialize;

use super::ApiState;
use crate::api::envelope::{ApiErrorResponse, ApiResponse};
use crate::metrics::MetricKind;
use crate::telemetry::TimeWindow;
use crate::types::{LoadState, MetricSnapshot, Reading};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, `loading` or `degraded`
    pub status: &'static str,
    pub load_state: LoadState,
    pub uptime_secs: u64,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct WindowResponse {
    pub window: TimeWindow,
    pub label: &'static str,
    pub readings: Vec<Reading>,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub reading: Reading,
    pub metrics: MetricSnapshot,
}

#[derive(Debug, Serialize)]
pub struct SparklineResponse {
    pub metric: MetricKind,
    pub unit: &'static str,
    pub chart: crate::types::ChartData,
}

/// GET /api/v1/health
pub async fn health(State(state): State<ApiState>) -> Response {
    let load_state = state.dashboard.load_state().await;
    let status = match load_state {
        LoadState::Ready => "ok",
        LoadState::Loading => "loading",
        LoadState::Failed { .. } => "degraded",
    };
    ApiResponse::ok(HealthResponse {
        status,
        load_state,
        uptime_secs: state.started_at.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /api/v1/telemetry
pub async fn get_telemetry(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.dashboard.buffer().await)
}

/// GET /api/v1/telemetry/status
pub async fn get_telemetry_status(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.dashboard.telemetry_status().await)
}

/// GET /api/v1/telemetry/latest
pub async fn get_latest(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.dashboard.latest().await)
}

/// GET /api/v1/telemetry/window/:window
pub async fn get_window(State(state): State<ApiState>, Path(window): Path<String>) -> Response {
    let window: TimeWindow = match window.parse() {
        Ok(w) => w,
        Err(e) => return ApiErrorResponse::bad_request(e.to_string()),
    };
    ApiResponse::ok(WindowResponse {
        window,
        label: window.label(),
        readings: state.dashboard.project(window).await,
    })
}

/// GET /api/v1/metrics
pub async fn get_metrics(State(state): State<ApiState>) -> Response {
    let reading = state.dashboard.latest().await;
    ApiResponse::ok(MetricsResponse {
        reading,
        metrics: crate::metrics::derive_all_metrics(&reading),
    })
}

/// GET /api/v1/metrics/:metric/sparkline
pub async fn get_sparkline(State(state): State<ApiState>, Path(metric): Path<String>) -> Response {
    let metric: MetricKind = match metric.parse() {
        Ok(m) => m,
        Err(e) => return ApiErrorResponse::not_found(e.to_string()),
    };
    ApiResponse::ok(SparklineResponse {
        metric,
        unit: metric.unit(),
        chart: state.dashboard.derive_sparkline(metric).await,
    })
}

/// GET /api/v1/temperature
pub async fn get_temperature(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.dashboard.derive_temperature().await)
}
