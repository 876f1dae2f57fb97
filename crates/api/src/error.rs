use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::errors::{ErrorKind, SharingError};
use serde::Serialize;
use thiserror::Error;

use crate::services::ControllerError;

/// Label of the single action offered with every error alert.
pub const DISMISS_LABEL: &str = "Close";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Sharing(#[from] SharingError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Alert body: a title, a message and one dismiss action.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub title: String,
    pub message: String,
    pub dismiss: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Sharing(err) => match (err.kind(), err) {
                (_, SharingError::DeviceNameTaken(_)) | (_, SharingError::DeviceNameLocked) => {
                    (StatusCode::CONFLICT, "conflict")
                }
                (ErrorKind::Validation, _) => (StatusCode::BAD_REQUEST, "validation_error"),
                (ErrorKind::PermissionDenied, _) => (StatusCode::FORBIDDEN, "permission_denied"),
                (ErrorKind::LocationUnavailable, _) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "location_unavailable")
                }
                (ErrorKind::Network, _) => (StatusCode::SERVICE_UNAVAILABLE, "network_error"),
                (ErrorKind::Backend, _) => (StatusCode::BAD_GATEWAY, "backend_error"),
            },
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let (title, message) = match &self {
            ApiError::Sharing(err) => (err.title().to_string(), err.message()),
            ApiError::Validation(msg) => ("Invalid request.".to_string(), msg.clone()),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    "Failed.".to_string(),
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: code.to_string(),
            title,
            message,
            dismiss: DISMISS_LABEL.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ControllerError> for ApiError {
    fn from(err: ControllerError) -> Self {
        match err {
            ControllerError::Sharing(err) => ApiError::Sharing(err),
            ControllerError::Closed => {
                ApiError::Internal("sharing session is not running".to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}
