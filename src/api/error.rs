//! Rendering of [`Error`] as HTTP responses.

use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// JSON body of every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// User-facing message
    pub error: String,
}

impl Error {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        if self.is_connectivity() {
            return StatusCode::SERVICE_UNAVAILABLE;
        }
        if self.is_validation() {
            return StatusCode::UNPROCESSABLE_ENTITY;
        }
        match self {
            Self::InvalidCredentials | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::BucketNotFound { .. }
            | Self::CategoryNotFound { .. }
            | Self::LocationNotFound { .. }
            | Self::AllocationNotFound { .. } => StatusCode::NOT_FOUND,
            Self::CategoryExists { .. } | Self::UsernameTaken { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {self}");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
