//! `{data, meta}` and `{error, meta}` bodies returned by every JSON handler.
//!
//! Artifact downloads are the only responses that bypass this module.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

const API_VERSION: &str = "1";

#[derive(Debug, Serialize)]
pub struct Meta {
    pub timestamp: String,
    pub version: &'static str,
}

impl Meta {
    fn at(now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            version: API_VERSION,
        }
    }
}

/// Machine-readable error class; serialized as `BAD_REQUEST`, `NOT_FOUND`...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    NotFound,
    InternalError,
}

impl ErrorCode {
    fn status(self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: Meta,
}

impl<T: Serialize> ApiResponse<T> {
    fn with_status(status: StatusCode, data: T) -> Response {
        let meta = Meta::at(Utc::now());
        (status, Json(Self { data, meta })).into_response()
    }

    pub fn ok(data: T) -> Response {
        Self::with_status(StatusCode::OK, data)
    }

    /// 201, used when a report job has been accepted.
    pub fn created(data: T) -> Response {
        Self::with_status(StatusCode::CREATED, data)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ErrorBody,
    pub meta: Meta,
}

impl ApiErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Response {
        let body = Self {
            error: ErrorBody {
                code,
                message: message.into(),
            },
            meta: Meta::at(Utc::now()),
        };
        (code.status(), Json(body)).into_response()
    }

    pub fn bad_request(message: impl Into<String>) -> Response {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Response {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Response {
        Self::new(ErrorCode::InternalError, message)
    }
}
