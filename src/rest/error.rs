use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use validator::ValidationErrors;

use super::models::ErrorResponse;
use crate::types::TodoError;

/// Everything a handler can fail with, rendered as `{"detail": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was rejected before any store access.
    #[error("{detail}")]
    Rejected { status: StatusCode, detail: String },
    #[error(transparent)]
    Todo(#[from] TodoError),
    #[error("Error running store task: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Rejected { status, .. } => *status,
            ApiError::Todo(TodoError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Todo(TodoError::Internal { .. }) | ApiError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Rejected {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: errors.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();
        if status.is_server_error() {
            log::error!("{}", detail);
        } else {
            log::warn!("{}", detail);
        }
        (status, Json(ErrorResponse { detail })).into_response()
    }
}
