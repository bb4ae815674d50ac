//! JSON error responses

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::errors::DocError;

/// Body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Handler error: a [`DocError`] rendered as `{"error": ...}`
#[derive(Debug)]
pub struct ApiError(pub DocError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DocError::NotFound { .. } => StatusCode::NOT_FOUND,
            DocError::SynthesizerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "request failed");
        }
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

impl From<DocError> for ApiError {
    fn from(err: DocError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(DocError::InvalidRequest(rejection.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError(DocError::InvalidRequest(err.body_text()))
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
