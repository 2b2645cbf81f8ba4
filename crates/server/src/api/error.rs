//! Error responses shared by the API handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use luckyticket_core::{MediaError, PipelineError};

/// Longest accepted user id.
const MAX_USER_ID_LEN: usize = 64;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error kind.
    pub kind: String,
}

/// An error returned by a handler.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            PipelineError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            PipelineError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            PipelineError::AlreadyInProgress | PipelineError::NoMediaSelected => {
                StatusCode::CONFLICT
            }
            PipelineError::Cancelled => StatusCode::CONFLICT,
            PipelineError::Media(MediaError::NotFound { .. }) => StatusCode::NOT_FOUND,
            PipelineError::Media(MediaError::OutsideRoot { .. }) => StatusCode::BAD_REQUEST,
            PipelineError::Media(MediaError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::Media(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::TicketNotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::CaptureFailed(_) | PipelineError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            error!(kind = err.kind(), error = %err, "Pipeline request failed");
        } else {
            warn!(kind = err.kind(), error = %err, "Pipeline request rejected");
        }

        Self::new(status, err.kind(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
                kind: self.kind.to_string(),
            }),
        )
            .into_response()
    }
}

/// User ids come from the URL: 1 to 64 characters of `[A-Za-z0-9_.-]`.
pub fn validate_user_id(user_id: &str) -> Result<(), ApiError> {
    let valid = !user_id.is_empty()
        && user_id.len() <= MAX_USER_ID_LEN
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!("Invalid user id: {:?}", user_id)))
    }
}
