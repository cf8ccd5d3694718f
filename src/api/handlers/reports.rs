//! Report job endpoints: submit, list, inspect, cancel, delete, download

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::warn;

use super::ApiState;
use crate::api::envelope::{ApiErrorResponse, ApiResponse};
use crate::reports::ReportError;
use crate::types::{ReportConfig, ReportJob};

#[derive(Debug, Serialize)]
pub struct ReportListResponse {
    pub jobs: Vec<ReportJob>,
    pub is_generating: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: String,
    pub job: Option<ReportJob>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub removed: usize,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub id: String,
    pub deleted: bool,
}

fn error_response(e: ReportError) -> Response {
    match e {
        ReportError::Validation(msg) => ApiErrorResponse::bad_request(msg),
        ReportError::NotFound(_) => ApiErrorResponse::not_found(e.to_string()),
        ReportError::UnsupportedFormat(_) => ApiErrorResponse::bad_request(e.to_string()),
        ReportError::Generation(_) => ApiErrorResponse::internal(e.to_string()),
    }
}

/// GET /api/v1/reports
pub async fn list_reports(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(ReportListResponse {
        jobs: state.dashboard.list_jobs().await,
        is_generating: state.dashboard.is_generating().await,
    })
}

/// POST /api/v1/reports
pub async fn submit_report(
    State(state): State<ApiState>,
    payload: Result<Json<ReportConfig>, JsonRejection>,
) -> Response {
    let Json(config) = match payload {
        Ok(p) => p,
        Err(rejection) => return ApiErrorResponse::bad_request(rejection.body_text()),
    };
    match state.dashboard.submit_report(config).await {
        Ok(id) => {
            let job = state.dashboard.get_job(&id).await;
            ApiResponse::created(SubmitResponse { id, job })
        }
        Err(e) => {
            warn!(error = %e, "Report submission rejected");
            error_response(e)
        }
    }
}

/// GET /api/v1/reports/variables
pub async fn report_variables(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.dashboard.report_variables())
}

/// DELETE /api/v1/reports/completed
pub async fn clear_completed(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(ClearResponse {
        removed: state.dashboard.clear_completed().await,
    })
}

/// GET /api/v1/reports/:id
pub async fn get_report(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    match state.dashboard.get_job(&id).await {
        Some(job) => ApiResponse::ok(job),
        None => error_response(ReportError::NotFound(id)),
    }
}

/// DELETE /api/v1/reports/:id
pub async fn delete_report(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    if state.dashboard.delete_report(&id).await {
        ApiResponse::ok(DeleteResponse { id, deleted: true })
    } else {
        error_response(ReportError::NotFound(id))
    }
}

/// POST /api/v1/reports/:id/cancel
pub async fn cancel_report(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    match state.dashboard.cancel_report(&id).await {
        Ok(job) => ApiResponse::ok(job),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/reports/:id/download
///
/// Raw artifact bytes, not wrapped in the envelope.
pub async fn download_report(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    match state.dashboard.download_report(&id).await {
        Some(download) => (
            [
                (header::CONTENT_TYPE, download.content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", download.filename),
                ),
            ],
            download.bytes.to_vec(),
        )
            .into_response(),
        None => ApiErrorResponse::not_found(format!("report '{id}' has no artifact to download")),
    }
}
