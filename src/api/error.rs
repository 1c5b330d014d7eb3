use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::json_response;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{field} {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::Json(_) => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        json_response(
            self.status(),
            ErrorResponse {
                error: self.to_string(),
            },
        )
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
