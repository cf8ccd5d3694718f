//! API route table.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{self, ApiState};

/// Build the `/api/v1` router.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Telemetry
        .route("/telemetry", get(handlers::get_telemetry))
        .route("/telemetry/status", get(handlers::get_telemetry_status))
        .route("/telemetry/latest", get(handlers::get_latest))
        .route("/telemetry/window/:window", get(handlers::get_window))
        .route("/metrics", get(handlers::get_metrics))
        .route("/metrics/:metric/sparkline", get(handlers::get_sparkline))
        .route("/temperature", get(handlers::get_temperature))
        // Reports (static paths before the parameterized ones)
        .route(
            "/reports",
            get(handlers::list_reports).post(handlers::submit_report),
        )
        .route("/reports/variables", get(handlers::report_variables))
        .route("/reports/completed", axum::routing::delete(handlers::clear_completed))
        .route(
            "/reports/:id",
            get(handlers::get_report).delete(handlers::delete_report),
        )
        .route("/reports/:id/cancel", post(handlers::cancel_report))
        .route("/reports/:id/download", get(handlers::download_report))
        .with_state(state)
}
